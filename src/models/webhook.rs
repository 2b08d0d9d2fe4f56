use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of a WHOOP webhook delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhoopWebhookPayload {
    /// WHOOP member id (not our user id)
    pub user_id: i64,
    /// Id of the changed object. v1 sends integers, v2 sends UUID strings.
    pub id: WebhookObjectId,
    #[serde(rename = "type")]
    pub event_type: WhoopEventType,
    pub trace_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WebhookObjectId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for WebhookObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebhookObjectId::Numeric(id) => write!(f, "{}", id),
            WebhookObjectId::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WhoopEventType {
    #[serde(rename = "recovery.updated")]
    RecoveryUpdated,
    #[serde(rename = "recovery.deleted")]
    RecoveryDeleted,
    #[serde(rename = "sleep.updated")]
    SleepUpdated,
    #[serde(rename = "sleep.deleted")]
    SleepDeleted,
    #[serde(rename = "workout.updated")]
    WorkoutUpdated,
    #[serde(rename = "workout.deleted")]
    WorkoutDeleted,
    #[serde(other, rename = "unknown")]
    Unknown,
}

impl WhoopEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WhoopEventType::RecoveryUpdated => "recovery.updated",
            WhoopEventType::RecoveryDeleted => "recovery.deleted",
            WhoopEventType::SleepUpdated => "sleep.updated",
            WhoopEventType::SleepDeleted => "sleep.deleted",
            WhoopEventType::WorkoutUpdated => "workout.updated",
            WhoopEventType::WorkoutDeleted => "workout.deleted",
            WhoopEventType::Unknown => "unknown",
        }
    }

    pub fn is_deletion(&self) -> bool {
        matches!(
            self,
            WhoopEventType::RecoveryDeleted
                | WhoopEventType::SleepDeleted
                | WhoopEventType::WorkoutDeleted
        )
    }
}

/// Signature headers pulled off an incoming webhook request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookHeaders {
    pub signature: String,
    /// Raw header text; the signature is computed over it verbatim
    pub timestamp: String,
}

/// A webhook delivery we have accepted
#[derive(Debug, Clone, Serialize)]
pub struct WebhookEventRecord {
    pub event_type: WhoopEventType,
    pub whoop_user_id: i64,
    pub object_id: WebhookObjectId,
    pub trace_id: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum RecordOutcome {
    Accepted(WebhookEventRecord),
    Duplicate(WebhookEventRecord),
}

impl RecordOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, RecordOutcome::Duplicate(_))
    }

    pub fn record(&self) -> &WebhookEventRecord {
        match self {
            RecordOutcome::Accepted(record) | RecordOutcome::Duplicate(record) => record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_with_numeric_id() {
        let payload: WhoopWebhookPayload = serde_json::from_value(json!({
            "user_id": 10129,
            "id": 173958,
            "type": "recovery.updated",
            "trace_id": "e369c784-5100-49e8-8098-75d35c47b31b"
        }))
        .unwrap();

        assert_eq!(payload.id, WebhookObjectId::Numeric(173958));
        assert_eq!(payload.event_type, WhoopEventType::RecoveryUpdated);
    }

    #[test]
    fn test_payload_with_uuid_id_and_unknown_type() {
        let payload: WhoopWebhookPayload = serde_json::from_value(json!({
            "user_id": 10129,
            "id": "ecfc6a15-4661-442f-a9a4-f160dd7afae8",
            "type": "body_measurement.updated",
            "trace_id": "abc"
        }))
        .unwrap();

        assert_eq!(
            payload.id.to_string(),
            "ecfc6a15-4661-442f-a9a4-f160dd7afae8"
        );
        assert_eq!(payload.event_type, WhoopEventType::Unknown);
    }

    #[test]
    fn test_deletion_events() {
        assert!(WhoopEventType::SleepDeleted.is_deletion());
        assert!(!WhoopEventType::WorkoutUpdated.is_deletion());
    }
}
