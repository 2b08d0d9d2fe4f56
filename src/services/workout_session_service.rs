use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;
use validator::Validate;

use crate::models::{SavedSession, WorkoutSavePayload, WorkoutSession, WorkoutUpdateEvent};
use crate::services::WorkoutUpdateBroadcaster;

/// Receives workout saves (live or replayed from the offline queue) and
/// notifies the user's open connections.
#[derive(Clone)]
pub struct WorkoutSessionService {
    sessions: Arc<RwLock<HashMap<Uuid, HashMap<Uuid, WorkoutSession>>>>,
    broadcaster: WorkoutUpdateBroadcaster,
}

impl WorkoutSessionService {
    pub fn new(broadcaster: WorkoutUpdateBroadcaster) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            broadcaster,
        }
    }

    /// Upsert a session. Saves are applied in arrival order; the last write wins.
    pub fn save(&self, user_id: Uuid, payload: WorkoutSavePayload) -> Result<SavedSession> {
        payload.validate().context("Invalid workout payload")?;

        // Broadcast under the sessions lock so connections see revisions in order
        let (session, created, notified_connections) = {
            let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
            let user_sessions = sessions.entry(user_id).or_default();

            let revision = user_sessions
                .get(&payload.session_id)
                .map_or(1, |existing| existing.revision + 1);

            let session = WorkoutSession {
                session_id: payload.session_id,
                user_id,
                template_id: payload.template_id,
                workout_date: payload.workout_date,
                exercises: payload.exercises,
                revision,
                updated_at: Utc::now(),
            };
            user_sessions.insert(session.session_id, session.clone());

            let notified = self
                .broadcaster
                .broadcast(user_id, &WorkoutUpdateEvent::workout_updated(&session));

            (session, revision == 1, notified)
        };

        tracing::info!(
            %user_id,
            session_id = %session.session_id,
            revision = session.revision,
            sets = session.total_sets(),
            notified_connections,
            "Saved workout session"
        );

        Ok(SavedSession {
            session,
            created,
            notified_connections,
        })
    }

    pub fn get(&self, user_id: Uuid, session_id: Uuid) -> Option<WorkoutSession> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&user_id)
            .and_then(|sessions| sessions.get(&session_id))
            .cloned()
    }

    /// The user's sessions, most recent workout first
    pub fn list(&self, user_id: Uuid) -> Vec<WorkoutSession> {
        let mut sessions: Vec<_> = self
            .sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&user_id)
            .map(|sessions| sessions.values().cloned().collect())
            .unwrap_or_default();

        sessions.sort_by(|a, b| b.workout_date.cmp(&a.workout_date));
        sessions
    }
}
