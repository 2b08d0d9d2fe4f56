pub mod rate_limiting;

pub use rate_limiting::{rate_limit_middleware, RateLimitConfig, RateLimitError, RateLimiter};
