mod queue;
mod readiness;
mod serve;
mod sign_webhook;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use queue::QueueCommand;
pub use readiness::ReadinessCommand;
pub use serve::ServeCommand;
pub use sign_webhook::SignWebhookCommand;

#[derive(Parser)]
#[command(name = "swole-tracker")]
#[command(about = "Workout tracking server and offline sync tools", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve(ServeCommand),

    /// Inspect and replay the offline workout queue
    Queue(QueueCommand),

    /// Compute today's readiness and overload multiplier
    Readiness(ReadinessCommand),

    /// Produce WHOOP signature headers for a webhook body
    SignWebhook(SignWebhookCommand),
}

impl Cli {
    /// Filter used when RUST_LOG is unset: `debug` with `--verbose`, otherwise
    /// LOG_LEVEL or `info`
    pub fn default_log_level(&self) -> String {
        if self.verbose {
            "debug".to_string()
        } else {
            std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
        }
    }

    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve(cmd) => cmd.execute().await,
            Commands::Queue(cmd) => cmd.execute().await,
            Commands::Readiness(cmd) => cmd.execute(),
            Commands::SignWebhook(cmd) => cmd.execute(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_verbose_selects_debug() {
        std::env::set_var("LOG_LEVEL", "warn");

        let cli = Cli::parse_from(["swole-tracker", "--verbose", "queue", "list"]);
        assert_eq!(cli.default_log_level(), "debug");

        let cli = Cli::parse_from(["swole-tracker", "queue", "list"]);
        assert_eq!(cli.default_log_level(), "warn");

        std::env::remove_var("LOG_LEVEL");
        assert_eq!(cli.default_log_level(), "info");
    }
}
