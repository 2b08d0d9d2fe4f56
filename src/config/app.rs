use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::offline_queue::DEFAULT_MAX_ATTEMPTS;

const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-in-production";
/// Replay window ceiling for WHOOP webhooks
const MAX_WEBHOOK_TOLERANCE_SECS: i64 = 3600;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub jwt_secret: String,
    /// Shared secret for `X-WHOOP-Signature`. Webhooks are rejected while unset.
    pub whoop_webhook_secret: Option<String>,
    pub webhook_tolerance_secs: i64,
    pub webhook_event_capacity: usize,
    pub offline_queue_dir: PathBuf,
    pub offline_queue_max_attempts: u32,
    pub sse_keep_alive_secs: u64,
    /// Plate increment recommended weights are rounded to
    pub load_increment: f64,
    pub rate_limit_per_minute: u32,
    pub rate_limit_per_hour: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let jwt_secret =
            env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string());

        // WHOOP webhook configuration (optional)
        let whoop_webhook_secret = env::var("WHOOP_WEBHOOK_SECRET")
            .ok()
            .filter(|secret| !secret.trim().is_empty());
        let webhook_tolerance_secs = parse_or("WEBHOOK_TOLERANCE_SECS", 300)?;
        let webhook_event_capacity = parse_or("WEBHOOK_EVENT_CAPACITY", 1000)?;

        let offline_queue_dir = match env::var("OFFLINE_QUEUE_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => Self::default_data_dir()?,
        };
        let offline_queue_max_attempts = parse_or("OFFLINE_QUEUE_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;

        let sse_keep_alive_secs = parse_or("SSE_KEEP_ALIVE_SECS", 15)?;
        let load_increment = parse_or("LOAD_INCREMENT", 2.5)?;
        let rate_limit_per_minute = parse_or("RATE_LIMIT_PER_MINUTE", 120)?;
        let rate_limit_per_hour = parse_or("RATE_LIMIT_PER_HOUR", 2000)?;

        let config = AppConfig {
            host,
            port,
            environment,
            jwt_secret,
            whoop_webhook_secret,
            webhook_tolerance_secs,
            webhook_event_capacity,
            offline_queue_dir,
            offline_queue_max_attempts,
            sse_keep_alive_secs,
            load_increment,
            rate_limit_per_minute,
            rate_limit_per_hour,
        };
        config.validate()?;

        Ok(config)
    }

    /// Get the default data directory (~/.swole-tracker/)
    pub fn default_data_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".swole-tracker"))
    }

    fn validate(&self) -> Result<()> {
        if self.is_production() && self.jwt_secret == DEFAULT_JWT_SECRET {
            bail!("JWT_SECRET must be set in production");
        }
        if !(1..=MAX_WEBHOOK_TOLERANCE_SECS).contains(&self.webhook_tolerance_secs) {
            bail!(
                "WEBHOOK_TOLERANCE_SECS must be between 1 and {}",
                MAX_WEBHOOK_TOLERANCE_SECS
            );
        }
        if !(self.load_increment.is_finite() && self.load_increment > 0.0) {
            bail!("LOAD_INCREMENT must be a positive number");
        }
        if self.offline_queue_max_attempts == 0 {
            bail!("OFFLINE_QUEUE_MAX_ATTEMPTS must be at least 1");
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn sse_keep_alive(&self) -> Duration {
        Duration::from_secs(self.sse_keep_alive_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            whoop_webhook_secret: None,
            webhook_tolerance_secs: 300,
            webhook_event_capacity: 1000,
            offline_queue_dir: PathBuf::from(".swole-tracker"),
            offline_queue_max_attempts: DEFAULT_MAX_ATTEMPTS,
            sse_keep_alive_secs: 15,
            load_increment: 2.5,
            rate_limit_per_minute: 120,
            rate_limit_per_hour: 2000,
        }
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "HOST",
            "PORT",
            "ENVIRONMENT",
            "JWT_SECRET",
            "WHOOP_WEBHOOK_SECRET",
            "WEBHOOK_TOLERANCE_SECS",
            "OFFLINE_QUEUE_DIR",
            "OFFLINE_QUEUE_MAX_ATTEMPTS",
            "LOAD_INCREMENT",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_from_empty_env() {
        clear_env();
        env::set_var("OFFLINE_QUEUE_DIR", "/tmp/swole-queue");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.webhook_tolerance_secs, 300);
        assert_eq!(config.offline_queue_max_attempts, 8);
        assert_eq!(config.offline_queue_dir, PathBuf::from("/tmp/swole-queue"));
        assert!(config.whoop_webhook_secret.is_none());
        assert_eq!(config.server_address(), "0.0.0.0:3000");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_blank_webhook_secret_is_unset() {
        clear_env();
        env::set_var("OFFLINE_QUEUE_DIR", "/tmp/swole-queue");
        env::set_var("WHOOP_WEBHOOK_SECRET", "   ");

        let config = AppConfig::from_env().unwrap();
        assert!(config.whoop_webhook_secret.is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_production_requires_jwt_secret() {
        clear_env();
        env::set_var("OFFLINE_QUEUE_DIR", "/tmp/swole-queue");
        env::set_var("ENVIRONMENT", "production");

        assert!(AppConfig::from_env().is_err());

        env::set_var("JWT_SECRET", "a-real-secret");
        let config = AppConfig::from_env().unwrap();
        assert!(config.is_production());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_number_is_an_error() {
        clear_env();
        env::set_var("OFFLINE_QUEUE_DIR", "/tmp/swole-queue");
        env::set_var("OFFLINE_QUEUE_MAX_ATTEMPTS", "lots");

        assert!(AppConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_webhook_tolerance_bounds() {
        clear_env();
        env::set_var("OFFLINE_QUEUE_DIR", "/tmp/swole-queue");

        for bad in ["0", "-5", "92233720368547758"] {
            env::set_var("WEBHOOK_TOLERANCE_SECS", bad);
            assert!(AppConfig::from_env().is_err(), "accepted {}", bad);
        }

        env::set_var("WEBHOOK_TOLERANCE_SECS", "3600");
        assert_eq!(AppConfig::from_env().unwrap().webhook_tolerance_secs, 3600);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_increment() {
        clear_env();
        env::set_var("OFFLINE_QUEUE_DIR", "/tmp/swole-queue");
        env::set_var("LOAD_INCREMENT", "1.25");
        assert_eq!(AppConfig::from_env().unwrap().load_increment, 1.25);

        env::set_var("LOAD_INCREMENT", "0");
        assert!(AppConfig::from_env().is_err());

        clear_env();
    }
}
