use axum::{
    extract::{FromRef, State},
    response::Json,
    routing::post,
    Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::auth::{JwtService, UserSession};
use crate::models::{ExperienceLevel, PlannedSet, TrainingAdjustment, WhoopMetrics};
use crate::services::ReadinessService;

#[derive(Debug, Deserialize)]
pub struct ReadinessRequest {
    #[serde(default)]
    pub metrics: WhoopMetrics,
    #[serde(default)]
    pub experience_level: ExperienceLevel,
    #[serde(default)]
    pub planned_sets: Vec<PlannedSet>,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub success: bool,
    #[serde(flatten)]
    pub adjustment: TrainingAdjustment,
}

#[derive(Clone, FromRef)]
pub struct ReadinessAppState {
    pub readiness_service: ReadinessService,
    pub jwt_service: JwtService,
}

pub fn readiness_routes(state: ReadinessAppState) -> Router {
    Router::new()
        .route("/readiness", post(compute_readiness))
        .with_state(state)
}

/// Readiness, overload multiplier and per-set adjustments for today's session
pub async fn compute_readiness(
    State(state): State<ReadinessAppState>,
    session: UserSession,
    WithRejection(Json(request), _): WithRejection<Json<ReadinessRequest>, ApiError>,
) -> Result<Json<ReadinessResponse>, ApiError> {
    let adjustment = state.readiness_service.recommend_adjustment(
        &request.metrics,
        request.experience_level,
        &request.planned_sets,
    );

    tracing::info!(
        user_id = %session.user_id,
        rho = adjustment.readiness.rho,
        multiplier = adjustment.overload_multiplier,
        "Computed readiness"
    );

    Ok(Json(ReadinessResponse {
        success: true,
        adjustment,
    }))
}
