use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use std::path::PathBuf;

use crate::services::sign_whoop_payload;
use crate::services::webhook_verification::{SIGNATURE_HEADER, TIMESTAMP_HEADER};

#[derive(Args)]
pub struct SignWebhookCommand {
    /// File holding the exact webhook body to sign
    file: PathBuf,

    /// Webhook signing secret
    #[arg(long, env = "WHOOP_WEBHOOK_SECRET", hide_env_values = true)]
    secret: String,

    /// Epoch milliseconds to sign with (defaults to now)
    #[arg(long)]
    timestamp: Option<i64>,
}

impl SignWebhookCommand {
    pub fn execute(self) -> Result<()> {
        let body = std::fs::read_to_string(&self.file)
            .with_context(|| format!("Failed to read {}", self.file.display()))?;
        let timestamp = self
            .timestamp
            .unwrap_or_else(|| Utc::now().timestamp_millis())
            .to_string();

        let signature = sign_whoop_payload(&body, &timestamp, &self.secret)
            .context("Secret cannot be used as an HMAC key")?;

        println!("{}: {}", SIGNATURE_HEADER, signature);
        println!("{}: {}", TIMESTAMP_HEADER, timestamp);
        Ok(())
    }
}
