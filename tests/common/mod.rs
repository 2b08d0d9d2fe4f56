#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, Response},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use swole_tracker::api::{create_routes, AppServices};
use swole_tracker::config::AppConfig;
use swole_tracker::services::sign_whoop_payload;

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_only";
pub const TEST_WEBHOOK_SECRET: &str = "whoop_test_webhook_secret";

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        whoop_webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
        sse_keep_alive_secs: 60,
        ..AppConfig::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub services: AppServices,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let services = AppServices::new(config);
        Self {
            router: create_routes(services.clone()),
            services,
        }
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        self.services
            .jwt_service
            .create_access_token(user_id)
            .expect("token")
    }
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }

    let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
    builder.body(body).unwrap()
}

pub fn signed_webhook_request(body: &str, timestamp_ms: i64, secret: &str) -> Request<Body> {
    let timestamp = timestamp_ms.to_string();
    let signature = sign_whoop_payload(body, &timestamp, secret).unwrap();

    Request::builder()
        .method(Method::POST)
        .uri("/api/webhooks/whoop")
        .header("Content-Type", "application/json")
        .header("x-whoop-signature", signature)
        .header("x-whoop-signature-timestamp", timestamp)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn webhook_body(event_type: &str, trace_id: &str) -> String {
    json!({
        "user_id": 10129,
        "id": 29381746,
        "type": event_type,
        "trace_id": trace_id,
    })
    .to_string()
}

pub fn workout_payload(session_id: Uuid) -> Value {
    json!({
        "session_id": session_id,
        "template_id": null,
        "workout_date": Utc::now(),
        "exercises": [{
            "exercise_name": "Back Squat",
            "sets": [
                { "weight": 100.0, "reps": 5, "unit": "kg" },
                { "weight": 100.0, "reps": 5, "unit": "kg" }
            ]
        }]
    })
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
