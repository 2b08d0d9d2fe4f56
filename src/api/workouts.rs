use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use super::error::ApiError;
use crate::auth::{JwtService, UserSession};
use crate::models::{SavedSession, WorkoutSavePayload, WorkoutSession};
use crate::services::WorkoutSessionService;

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<WorkoutSession>,
    pub total: usize,
}

#[derive(Clone, FromRef)]
pub struct WorkoutsAppState {
    pub session_service: WorkoutSessionService,
    pub jwt_service: JwtService,
}

pub fn workouts_routes(state: WorkoutsAppState) -> Router {
    Router::new()
        .route("/workouts/sessions", get(list_sessions).post(save_session))
        .route("/workouts/sessions/:session_id", get(get_session))
        .with_state(state)
}

/// Save (or overwrite) a workout session. Replays from the offline queue land
/// here too.
pub async fn save_session(
    State(state): State<WorkoutsAppState>,
    session: UserSession,
    WithRejection(Json(payload), _): WithRejection<Json<WorkoutSavePayload>, ApiError>,
) -> Result<(StatusCode, Json<SavedSession>), ApiError> {
    payload.validate()?;

    let saved = state
        .session_service
        .save(session.user_id, payload)
        .map_err(|e| {
            tracing::error!(user_id = %session.user_id, error = %e, "Failed to save workout");
            ApiError::internal("SAVE_FAILED", "Failed to save workout session")
        })?;

    let status = if saved.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(saved)))
}

pub async fn list_sessions(
    State(state): State<WorkoutsAppState>,
    session: UserSession,
) -> Json<SessionListResponse> {
    let sessions = state.session_service.list(session.user_id);
    Json(SessionListResponse {
        total: sessions.len(),
        sessions,
    })
}

pub async fn get_session(
    State(state): State<WorkoutsAppState>,
    session: UserSession,
    Path(session_id): Path<Uuid>,
) -> Result<Json<WorkoutSession>, ApiError> {
    state
        .session_service
        .get(session.user_id, session_id)
        .map(Json)
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::NOT_FOUND,
                "SESSION_NOT_FOUND",
                "Workout session not found",
            )
        })
}
