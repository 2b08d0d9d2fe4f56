//! HTTP client that replays queued workout saves against the server.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::models::{WorkoutSavePayload, WorkoutSession};

mod error;
mod retry;

pub use error::ClientError;
pub use retry::RetryConfig;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Server reply to a workout save
#[derive(Debug, Clone, Deserialize)]
pub struct SaveResponse {
    pub session: WorkoutSession,
    pub created: bool,
    pub notified_connections: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct SyncClient {
    client: Client,
    base_url: String,
    token: String,
    retry_config: RetryConfig,
}

impl SyncClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, token, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, token: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            retry_config: RetryConfig::default(),
        })
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub async fn save_workout(&self, payload: &WorkoutSavePayload) -> Result<SaveResponse, ClientError> {
        let url = format!("{}/api/v1/workouts/sessions", self.base_url);

        tracing::debug!(session_id = %payload.session_id, "Uploading workout");

        self.retry_config
            .execute(|| async {
                let response = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.token)
                    .json(payload)
                    .send()
                    .await?;

                let status = response.status();
                if status.is_success() {
                    return response
                        .json::<SaveResponse>()
                        .await
                        .map_err(|e| ClientError::Unknown(e.to_string()));
                }

                let message = response
                    .json::<ErrorBody>()
                    .await
                    .map(|body| body.message)
                    .unwrap_or_default();
                Err(ClientError::from_status(status, message))
            })
            .await
    }
}
