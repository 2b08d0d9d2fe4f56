use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use crate::models::{RecordOutcome, WebhookEventRecord, WebhookObjectId, WhoopEventType, WhoopWebhookPayload};

type EventKey = (WhoopEventType, WebhookObjectId, String);

#[derive(Default)]
struct EventLog {
    records: HashMap<EventKey, WebhookEventRecord>,
    order: VecDeque<EventKey>,
}

/// Remembers recently accepted WHOOP deliveries so re-deliveries are
/// acknowledged without being processed twice.
#[derive(Clone)]
pub struct WebhookEventService {
    capacity: usize,
    log: Arc<RwLock<EventLog>>,
}

impl WebhookEventService {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            log: Arc::new(RwLock::new(EventLog::default())),
        }
    }

    pub fn record(&self, payload: WhoopWebhookPayload) -> RecordOutcome {
        let key = (payload.event_type, payload.id.clone(), payload.trace_id.clone());
        let mut log = self.log.write().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = log.records.get(&key) {
            tracing::info!(
                event_type = payload.event_type.as_str(),
                trace_id = %payload.trace_id,
                "Duplicate WHOOP webhook delivery ignored"
            );
            return RecordOutcome::Duplicate(existing.clone());
        }

        let record = WebhookEventRecord {
            event_type: payload.event_type,
            whoop_user_id: payload.user_id,
            object_id: payload.id,
            trace_id: payload.trace_id,
            received_at: Utc::now(),
        };

        log.records.insert(key.clone(), record.clone());
        log.order.push_back(key);

        while log.order.len() > self.capacity {
            if let Some(oldest) = log.order.pop_front() {
                log.records.remove(&oldest);
            }
        }

        tracing::info!(
            event_type = record.event_type.as_str(),
            whoop_user_id = record.whoop_user_id,
            object_id = %record.object_id,
            deletion = record.event_type.is_deletion(),
            "Accepted WHOOP webhook"
        );

        RecordOutcome::Accepted(record)
    }

    pub fn len(&self) -> usize {
        self.log.read().unwrap_or_else(|e| e.into_inner()).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
