// API routes and handlers

pub mod error;
pub mod health;
pub mod readiness;
pub mod routes;
pub mod whoop_webhook;
pub mod workout_updates;
pub mod workouts;

pub use error::ApiError;
pub use routes::{create_routes, AppServices};
