use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use super::ClientError;

/// In-request retry with exponential backoff. Failures that survive it are
/// left to the offline queue's attempt counter.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn no_retry() -> Self {
        Self {
            max_retries: 1,
            ..Self::default()
        }
    }

    /// Run `func` until it succeeds, returns a non-retryable error, or the
    /// attempt budget is spent.
    pub async fn execute<F, Fut, T>(&self, mut func: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut attempt = 0;
        let mut delay_ms = self.initial_delay_ms;

        loop {
            match func().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempt += 1;

                    if !e.is_retryable() || attempt >= self.max_retries {
                        return Err(e);
                    }

                    tracing::debug!(attempt, delay_ms, error = %e, "Request failed, retrying");
                    sleep(Duration::from_millis(delay_ms)).await;

                    delay_ms =
                        ((delay_ms as f64 * self.backoff_factor) as u64).min(self.max_delay_ms);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_factor: 2.0,
        }
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result = fast()
            .execute(|| {
                let attempts = attempts.clone();
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ClientError::ServerError("busy".into()))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = fast()
            .execute(|| {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(ClientError::NetworkError("down".into()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rejection_not_retried() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = fast()
            .execute(|| {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(ClientError::Rejected("invalid".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(ClientError::Rejected(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
