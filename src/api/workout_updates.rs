use axum::{
    extract::{FromRef, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::{Stream, StreamExt};
use std::time::Duration;

use crate::auth::{JwtService, UserSession};
use crate::services::WorkoutUpdateBroadcaster;

#[derive(Clone, FromRef)]
pub struct WorkoutUpdatesAppState {
    pub broadcaster: WorkoutUpdateBroadcaster,
    pub jwt_service: JwtService,
    #[from_ref(skip)]
    pub keep_alive: Duration,
}

pub fn workout_updates_routes(state: WorkoutUpdatesAppState) -> Router {
    Router::new()
        .route("/workout-updates", get(workout_updates))
        .with_state(state)
}

/// Live feed of the caller's workout saves as `text/event-stream`.
///
/// The connection is deregistered when the client goes away and axum drops
/// the stream.
pub async fn workout_updates(
    State(state): State<WorkoutUpdatesAppState>,
    session: UserSession,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let updates = state.broadcaster.connect(session.user_id);
    tracing::debug!(
        user_id = %session.user_id,
        connection_id = %updates.connection_id(),
        "Opening workout update stream"
    );

    let events = updates.map(|update| Event::default().json_data(&update));

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(state.keep_alive)
            .text("keep-alive"),
    )
}
