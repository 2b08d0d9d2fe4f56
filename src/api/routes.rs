use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::health::health_check;
use super::readiness::{readiness_routes, ReadinessAppState};
use super::whoop_webhook::{webhook_routes, WebhookAppState};
use super::workout_updates::{workout_updates_routes, WorkoutUpdatesAppState};
use super::workouts::{workouts_routes, WorkoutsAppState};
use crate::auth::JwtService;
use crate::config::AppConfig;
use crate::middleware::{RateLimitConfig, RateLimiter};
use crate::services::{
    ReadinessService, WebhookEventService, WorkoutSessionService, WorkoutUpdateBroadcaster,
};

/// Long-lived services shared by every route
#[derive(Clone)]
pub struct AppServices {
    pub config: Arc<AppConfig>,
    pub jwt_service: JwtService,
    pub broadcaster: WorkoutUpdateBroadcaster,
    pub session_service: WorkoutSessionService,
    pub webhook_events: WebhookEventService,
    pub readiness_service: ReadinessService,
    pub rate_limiter: RateLimiter,
}

impl AppServices {
    pub fn new(config: AppConfig) -> Self {
        let broadcaster = WorkoutUpdateBroadcaster::new();
        let rate_limiter = RateLimiter::new(RateLimitConfig {
            requests_per_minute: config.rate_limit_per_minute,
            requests_per_hour: config.rate_limit_per_hour,
        });

        Self {
            jwt_service: JwtService::new(&config.jwt_secret),
            session_service: WorkoutSessionService::new(broadcaster.clone()),
            webhook_events: WebhookEventService::new(config.webhook_event_capacity),
            readiness_service: ReadinessService::new(config.load_increment),
            broadcaster,
            rate_limiter,
            config: Arc::new(config),
        }
    }
}

pub fn create_routes(services: AppServices) -> Router {
    let webhook_state = WebhookAppState {
        secret: services.config.whoop_webhook_secret.clone(),
        tolerance_secs: services.config.webhook_tolerance_secs,
        webhook_events: services.webhook_events.clone(),
    };
    let updates_state = WorkoutUpdatesAppState {
        broadcaster: services.broadcaster.clone(),
        jwt_service: services.jwt_service.clone(),
        keep_alive: services.config.sse_keep_alive(),
    };
    let readiness_state = ReadinessAppState {
        readiness_service: services.readiness_service.clone(),
        jwt_service: services.jwt_service.clone(),
    };
    let workouts_state = WorkoutsAppState {
        session_service: services.session_service.clone(),
        jwt_service: services.jwt_service.clone(),
    };

    let v1 = Router::new()
        .merge(readiness_routes(readiness_state))
        .merge(workouts_routes(workouts_state));

    Router::new()
        .route("/health", get(health_check))
        .nest(
            "/api/webhooks",
            webhook_routes(webhook_state, services.rate_limiter.clone()),
        )
        .nest("/api/sse", workout_updates_routes(updates_state))
        .nest("/api/v1", v1)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
