use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

#[derive(Debug, Serialize)]
pub struct RateLimitError {
    pub error_code: String,
    pub message: String,
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        (StatusCode::TOO_MANY_REQUESTS, Json(self)).into_response()
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub requests_per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 120,
            requests_per_hour: 2000,
        }
    }
}

#[derive(Debug, Default)]
struct RateLimitEntry {
    // Oldest first, trimmed to the last hour
    requests: VecDeque<Instant>,
}

impl RateLimitEntry {
    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.requests.front() {
            if now.duration_since(oldest) >= HOUR {
                self.requests.pop_front();
            } else {
                break;
            }
        }
    }

    fn count_within(&self, now: Instant, window: Duration) -> usize {
        self.requests
            .iter()
            .rev()
            .take_while(|&&t| now.duration_since(t) < window)
            .count()
    }

    fn last_seen(&self) -> Option<Instant> {
        self.requests.back().copied()
    }
}

/// Sliding-window request limiter keyed by client
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<RwLock<HashMap<String, RateLimitEntry>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            store: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn check_rate_limit(&self, key: &str) -> Result<(), RateLimitError> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), RateLimitError> {
        let mut store = self.store.write().unwrap_or_else(|e| e.into_inner());
        let entry = store.entry(key.to_string()).or_default();
        entry.prune(now);

        if entry.count_within(now, MINUTE) >= self.config.requests_per_minute as usize {
            tracing::warn!(client = key, "Rate limit exceeded (per minute)");
            return Err(RateLimitError {
                error_code: "RATE_LIMIT_EXCEEDED".to_string(),
                message: "Too many requests per minute".to_string(),
                retry_after: MINUTE.as_secs(),
            });
        }

        if entry.requests.len() >= self.config.requests_per_hour as usize {
            tracing::warn!(client = key, "Rate limit exceeded (per hour)");
            return Err(RateLimitError {
                error_code: "RATE_LIMIT_EXCEEDED".to_string(),
                message: "Too many requests per hour".to_string(),
                retry_after: HOUR.as_secs(),
            });
        }

        entry.requests.push_back(now);
        Ok(())
    }

    /// Forget clients idle for more than two hours
    pub fn cleanup_old_entries(&self) -> usize {
        let now = Instant::now();
        let mut store = self.store.write().unwrap_or_else(|e| e.into_inner());
        let before = store.len();

        store.retain(|_, entry| {
            entry
                .last_seen()
                .is_some_and(|seen| now.duration_since(seen) < HOUR * 2)
        });

        before - store.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.store.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Extract client identifier for rate limiting
fn get_client_key(headers: &HeaderMap, remote_addr: Option<SocketAddr>) -> String {
    // Try to get real IP from headers (for reverse proxy scenarios)
    if let Some(first_ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return first_ip.to_string();
    }

    if let Some(real_ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return real_ip.to_string();
    }

    remote_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(rate_limiter): State<RateLimiter>,
    headers: HeaderMap,
    req: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client_key = get_client_key(&headers, remote_addr);

    rate_limiter.check_rate_limit(&client_key)?;

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_minute_limit() {
        let limiter = RateLimiter::new(RateLimitConfig {
            requests_per_minute: 2,
            requests_per_hour: 100,
        });
        let now = Instant::now();

        assert!(limiter.check_at("client", now).is_ok());
        assert!(limiter.check_at("client", now).is_ok());
        let err = limiter.check_at("client", now).unwrap_err();
        assert_eq!(err.retry_after, 60);

        // Other clients are unaffected
        assert!(limiter.check_at("other", now).is_ok());

        // The window slides
        assert!(limiter.check_at("client", now + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn test_hour_limit() {
        let limiter = RateLimiter::new(RateLimitConfig {
            requests_per_minute: 100,
            requests_per_hour: 3,
        });
        let start = Instant::now();

        for i in 0..3 {
            assert!(limiter.check_at("client", start + MINUTE * i).is_ok());
        }
        let err = limiter
            .check_at("client", start + MINUTE * 10)
            .unwrap_err();
        assert_eq!(err.retry_after, 3600);

        assert!(limiter.check_at("client", start + HOUR + MINUTE).is_ok());
    }

    #[test]
    fn test_client_key_precedence() {
        let addr: SocketAddr = "10.0.0.9:5555".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(get_client_key(&headers, Some(addr)), "10.0.0.9");
        assert_eq!(get_client_key(&headers, None), "unknown");

        headers.insert("x-real-ip", HeaderValue::from_static("192.168.1.2"));
        assert_eq!(get_client_key(&headers, Some(addr)), "192.168.1.2");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(get_client_key(&headers, Some(addr)), "203.0.113.7");
    }

    #[test]
    fn test_cleanup_forgets_idle_clients() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        let now = Instant::now();

        assert!(limiter.check_at("active", now).is_ok());
        if let Some(idle_since) = now.checked_sub(HOUR * 3) {
            assert!(limiter.check_at("idle", idle_since).is_ok());
            assert_eq!(limiter.tracked_clients(), 2);
            assert_eq!(limiter.cleanup_old_entries(), 1);
        } else {
            assert_eq!(limiter.cleanup_old_entries(), 0);
        }

        assert_eq!(limiter.tracked_clients(), 1);
    }
}
