//! `steward` binary entry point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use steward_daemon::config::{ConfigOverrides, DaemonConfig};
use steward_daemon::daemon::Daemon;
use steward_store::StoreBackend;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "steward",
    version,
    about = "Reconciliation daemon for the Conthesis entity platform"
)]
struct Cli {
    /// Message-bus gateway endpoint (overrides CONTHESIS_BUS_URL)
    #[arg(long)]
    bus_url: Option<String>,

    /// Seconds between reconcile cycles
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long)]
    request_timeout_secs: Option<u64>,

    /// Store backend: "cas" or "combined"
    #[arg(long)]
    backend: Option<StoreBackend>,
}

impl Cli {
    fn overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            bus_url: self.bus_url,
            cycle_interval: self.interval_secs.map(Duration::from_secs),
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
            backend: self.backend,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let config = DaemonConfig::load(cli.overrides())?;

    let daemon = Arc::new(Daemon::connect(config).await?);
    tracing::info!("steward started");

    // Ctrl-C and SIGTERM both route into the graceful shutdown path.
    {
        let daemon = daemon.clone();
        tokio::spawn(async move {
            let mut term =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl-C received, shutting down...");
                }
                _ = async {
                    if let Some(ref mut t) = term { t.recv().await; }
                } => {
                    tracing::info!("SIGTERM received, shutting down...");
                }
            }
            daemon.shutdown().await;
        });
    }

    daemon.wait().await;
    tracing::info!("steward stopped");
    Ok(())
}

/// Set up tracing for daemon logging; `RUST_LOG` overrides the default.
fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();
}
