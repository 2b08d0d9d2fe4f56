use anyhow::{Context, Result};
use clap::Args;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::api::{create_routes, AppServices};
use crate::config::AppConfig;

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Args)]
pub struct ServeCommand {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

impl ServeCommand {
    pub async fn execute(self) -> Result<()> {
        let mut config = AppConfig::from_env().context("Failed to load configuration")?;
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }

        if config.whoop_webhook_secret.is_none() {
            tracing::warn!("WHOOP_WEBHOOK_SECRET is not set, all WHOOP webhooks will be rejected");
        }

        let address = config.server_address();
        let services = AppServices::new(config);

        let rate_limiter = services.rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                let removed = rate_limiter.cleanup_old_entries();
                if removed > 0 {
                    tracing::debug!(
                        removed,
                        tracked = rate_limiter.tracked_clients(),
                        "Pruned idle rate limit entries"
                    );
                }
            }
        });

        let app = create_routes(services);

        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind {}", address))?;
        tracing::info!("Swole Tracker server starting on http://{}", address);
        tracing::info!("Health check available at http://{}/health", address);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
