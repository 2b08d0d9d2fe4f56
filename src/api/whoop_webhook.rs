use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    middleware,
    response::Json,
    routing::post,
    Router,
};
use chrono::Utc;
use serde::Serialize;

use super::error::ApiError;
use crate::middleware::{rate_limit_middleware, RateLimiter};
use crate::models::WhoopWebhookPayload;
use crate::services::{extract_webhook_headers, verify_whoop_webhook, WebhookEventService};

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub duplicate: bool,
    pub event_type: String,
    pub trace_id: String,
}

#[derive(Clone)]
pub struct WebhookAppState {
    pub secret: Option<String>,
    pub tolerance_secs: i64,
    pub webhook_events: WebhookEventService,
}

pub fn webhook_routes(state: WebhookAppState, rate_limiter: RateLimiter) -> Router {
    Router::new()
        .route("/whoop", post(receive_whoop_webhook))
        .route_layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ))
        .with_state(state)
}

/// Accept a signed WHOOP event.
///
/// The body is taken as raw bytes so the signature is checked against
/// exactly what WHOOP signed, before any JSON parsing.
pub async fn receive_whoop_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let now = Utc::now();

    let webhook_headers = extract_webhook_headers(&headers, now, state.tolerance_secs)
        .ok_or_else(|| {
            ApiError::bad_request(
                "MISSING_SIGNATURE_HEADERS",
                "Missing, malformed or stale WHOOP signature headers",
            )
        })?;

    let body = std::str::from_utf8(&body).map_err(|e| {
        tracing::warn!(reason = "invalid_utf8", error = %e, "WHOOP webhook rejected");
        ApiError::bad_request("INVALID_PAYLOAD", "Webhook body is not valid UTF-8")
    })?;

    if !verify_whoop_webhook(
        body,
        &webhook_headers.signature,
        &webhook_headers.timestamp,
        state.secret.as_deref(),
        now,
        state.tolerance_secs,
    ) {
        return Err(ApiError::unauthorized(
            "INVALID_SIGNATURE",
            "WHOOP webhook signature verification failed",
        ));
    }

    let payload: WhoopWebhookPayload = serde_json::from_str(body).map_err(|e| {
        tracing::warn!(error = %e, "Signed WHOOP webhook has an unreadable body");
        ApiError::bad_request("INVALID_PAYLOAD", "Webhook body is not a valid WHOOP event")
            .with_details(serde_json::json!({ "reason": e.to_string() }))
    })?;

    let outcome = state.webhook_events.record(payload);
    let record = outcome.record();

    tracing::info!(
        event_type = record.event_type.as_str(),
        whoop_user_id = record.whoop_user_id,
        object_id = %record.object_id,
        trace_id = %record.trace_id,
        duplicate = outcome.is_duplicate(),
        "WHOOP webhook accepted"
    );

    Ok(Json(WebhookResponse {
        success: true,
        duplicate: outcome.is_duplicate(),
        event_type: record.event_type.as_str().to_string(),
        trace_id: record.trace_id.clone(),
    }))
}
