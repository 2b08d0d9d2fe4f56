use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

use crate::client::SyncClient;
use crate::config::AppConfig;
use crate::models::WorkoutSavePayload;
use crate::services::OfflineQueue;

#[derive(Args)]
pub struct QueueCommand {
    /// Directory holding the queue file (overrides OFFLINE_QUEUE_DIR)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Attempts before a queued save is dropped (overrides OFFLINE_QUEUE_MAX_ATTEMPTS)
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    #[command(subcommand)]
    action: QueueAction,
}

#[derive(Subcommand)]
enum QueueAction {
    /// Show queued saves, oldest first
    List,

    /// Queue a workout save read from a JSON file
    Enqueue {
        /// Path to a workout save payload
        file: PathBuf,
    },

    /// Replay queued saves against the server
    Flush {
        /// Server base URL
        #[arg(long, env = "SWOLE_TRACKER_URL", default_value = "http://localhost:3000")]
        server_url: String,

        /// Bearer token for the server
        #[arg(long, env = "SWOLE_TRACKER_TOKEN")]
        token: String,
    },

    /// Remove every queued save
    Clear,
}

impl QueueCommand {
    pub async fn execute(self) -> Result<()> {
        let config = AppConfig::from_env().context("Failed to load configuration")?;
        let dir = self.dir.unwrap_or(config.offline_queue_dir);
        let max_attempts = self.max_attempts.unwrap_or(config.offline_queue_max_attempts);

        let queue = OfflineQueue::open(&dir, max_attempts)
            .with_context(|| format!("Failed to open offline queue in {}", dir.display()))?;

        match self.action {
            QueueAction::List => list(&queue),
            QueueAction::Enqueue { file } => enqueue(&queue, &file),
            QueueAction::Flush { server_url, token } => flush(&queue, &server_url, &token).await,
            QueueAction::Clear => {
                let removed = queue.clear()?;
                println!("✓ Cleared {} queued save(s)", removed);
                Ok(())
            }
        }
    }
}

fn list(queue: &OfflineQueue) -> Result<()> {
    let items = queue.items()?;
    if items.is_empty() {
        println!("Offline queue is empty ({})", queue.path().display());
        return Ok(());
    }

    println!("{} queued save(s) in {}", items.len(), queue.path().display());
    println!();
    for item in items {
        println!(
            "{}  session {}  {} exercise(s)  attempts {}/{}  queued {}",
            item.id,
            item.payload.session_id,
            item.payload.exercises.len(),
            item.attempts,
            queue.max_attempts(),
            item.enqueued_at.format("%Y-%m-%d %H:%M")
        );
        if let Some(error) = &item.last_error {
            println!("    last error: {}", error);
        }
    }
    Ok(())
}

fn enqueue(queue: &OfflineQueue, file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let payload: WorkoutSavePayload =
        serde_json::from_str(&contents).context("File is not a workout save payload")?;

    let item = queue.enqueue(payload)?;
    println!("✓ Queued {} ({} pending)", item.id, queue.len()?);
    Ok(())
}

async fn flush(queue: &OfflineQueue, server_url: &str, token: &str) -> Result<()> {
    if queue.is_empty()? {
        println!("Nothing to sync");
        return Ok(());
    }

    let client = SyncClient::new(server_url, token)?;
    let client = &client;

    println!("Syncing {} queued save(s) to {}...", queue.len()?, server_url);
    let summary = queue
        .flush(move |payload| async move {
            client.save_workout(&payload).await?;
            Ok::<_, anyhow::Error>(())
        })
        .await?;

    println!();
    println!("  Sent:      {}", summary.sent);
    println!("  Failed:    {}", summary.failed);
    println!("  Dropped:   {}", summary.dropped);
    println!("  Remaining: {}", summary.remaining);
    Ok(())
}
