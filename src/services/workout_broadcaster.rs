//! Per-user fan-out of workout updates to live SSE connections.
//!
//! The connection map is process local. Running several server instances means
//! a client only hears about saves handled by the instance it is connected to.

use chrono::Utc;
use futures::stream::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::WorkoutUpdateEvent;

type Writer = mpsc::UnboundedSender<WorkoutUpdateEvent>;
type ConnectionMap = HashMap<Uuid, HashMap<Uuid, Writer>>;

#[derive(Clone, Default)]
pub struct WorkoutUpdateBroadcaster {
    connections: Arc<RwLock<ConnectionMap>>,
}

impl WorkoutUpdateBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection for `user_id`. The returned stream starts
    /// with a `connected` event and deregisters itself when dropped.
    pub fn connect(&self, user_id: Uuid) -> WorkoutUpdateStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = Uuid::new_v4();

        // The receiver is alive, so this cannot fail
        let _ = tx.send(WorkoutUpdateEvent::Connected {
            user_id,
            connection_id,
            timestamp: Utc::now(),
        });

        let total = {
            let mut connections = self.connections.write().unwrap_or_else(|e| e.into_inner());
            let writers = connections.entry(user_id).or_default();
            writers.insert(connection_id, tx);
            writers.len()
        };

        tracing::info!(%user_id, %connection_id, user_connections = total, "SSE client connected");

        WorkoutUpdateStream {
            rx,
            guard: ConnectionGuard {
                broadcaster: self.clone(),
                user_id,
                connection_id,
            },
        }
    }

    /// Write `event` to every connection of `user_id`, returning how many
    /// writes succeeded. Writers that fail are removed and closed.
    pub fn broadcast(&self, user_id: Uuid, event: &WorkoutUpdateEvent) -> usize {
        let mut connections = self.connections.write().unwrap_or_else(|e| e.into_inner());

        let Some(writers) = connections.get_mut(&user_id) else {
            tracing::debug!(%user_id, event_type = event.event_type(), "No live connections for user");
            return 0;
        };

        let mut delivered = 0;
        writers.retain(|connection_id, writer| match writer.send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                tracing::warn!(%user_id, %connection_id, "Removing dead SSE connection");
                false
            }
        });

        if writers.is_empty() {
            connections.remove(&user_id);
        }

        tracing::debug!(%user_id, event_type = event.event_type(), delivered, "Broadcast workout update");
        delivered
    }

    pub fn disconnect(&self, user_id: Uuid, connection_id: Uuid) -> bool {
        let mut connections = self.connections.write().unwrap_or_else(|e| e.into_inner());

        let Some(writers) = connections.get_mut(&user_id) else {
            return false;
        };
        let removed = writers.remove(&connection_id).is_some();
        if writers.is_empty() {
            connections.remove(&user_id);
        }

        if removed {
            tracing::info!(%user_id, %connection_id, "SSE client disconnected");
        }
        removed
    }

    pub fn connection_count(&self, user_id: Uuid) -> usize {
        self.connections
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&user_id)
            .map_or(0, HashMap::len)
    }

    pub fn total_connections(&self) -> usize {
        self.connections
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(HashMap::len)
            .sum()
    }
}

struct ConnectionGuard {
    broadcaster: WorkoutUpdateBroadcaster,
    user_id: Uuid,
    connection_id: Uuid,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.broadcaster.disconnect(self.user_id, self.connection_id);
    }
}

/// Events for one connection, in the order they were broadcast
pub struct WorkoutUpdateStream {
    rx: mpsc::UnboundedReceiver<WorkoutUpdateEvent>,
    guard: ConnectionGuard,
}

impl WorkoutUpdateStream {
    pub fn connection_id(&self) -> Uuid {
        self.guard.connection_id
    }
}

impl Stream for WorkoutUpdateStream {
    type Item = WorkoutUpdateEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
