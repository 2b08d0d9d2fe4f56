// Business logic services

pub mod offline_queue;
pub mod readiness_service;
pub mod webhook_event_service;
pub mod webhook_verification;
pub mod workout_broadcaster;
pub mod workout_session_service;

pub use offline_queue::{AttemptOutcome, FlushSummary, OfflineQueue, QueueError, QueuedWorkoutSave};
pub use readiness_service::{calculate_overload_multiplier, calculate_readiness, ReadinessService};
pub use webhook_event_service::WebhookEventService;
pub use webhook_verification::{extract_webhook_headers, sign_whoop_payload, verify_whoop_webhook};
pub use workout_broadcaster::{WorkoutUpdateBroadcaster, WorkoutUpdateStream};
pub use workout_session_service::WorkoutSessionService;
