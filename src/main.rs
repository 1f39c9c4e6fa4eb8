//! easyvr-daemon: keeps an EasyVR module initialized and logs its events
//!
//! The module is reached through a TCP serial bridge. The daemon:
//! - Runs the initialization handshake once the module has booted
//! - Logs connection and recognition events
//! - Tears the link down on SIGINT/SIGTERM or when the link fails

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use easyvr::lifecycle::ShutdownSignal;
use easyvr::{Config, DeviceEvent, EasyVr, RunOutcome, TcpTransport};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "easyvr-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    info!(%config.address, "configuration loaded");

    let mut shutdown =
        ShutdownSignal::install().context("failed to install signal handlers")?;

    // Driver -> event logger
    let (event_tx, mut event_rx) = broadcast::channel::<DeviceEvent>(64);

    let events = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => info!(id = %event.id(), %event, "device event"),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let transport = TcpTransport::connect(config.address)
        .with_context(|| format!("failed to connect to serial bridge {}", config.address))?;

    let device = config.device.clone();
    let sink = Arc::new(event_tx);
    let easyvr = tokio::task::spawn_blocking(move || {
        EasyVr::open(Arc::new(transport), sink, &device)
    })
    .await?
    .context("failed to initialize EasyVR")?;

    info!("daemon initialized, entering main loop");

    let outcome = easyvr
        .run_until_shutdown(async {
            let signal = shutdown.wait().await;
            info!(signal, "shutdown requested");
        })
        .await;

    // Cleanup
    info!(?outcome, "shutting down...");
    easyvr.close();
    drop(easyvr);
    // Let the final connection event reach the log
    let _ = tokio::time::timeout(Duration::from_secs(1), events).await;

    info!("easyvr-daemon stopped");

    match outcome {
        RunOutcome::Shutdown => Ok(()),
        RunOutcome::LinkLost => anyhow::bail!("link to EasyVR lost"),
    }
}
