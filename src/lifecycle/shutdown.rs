//! Shutdown signals for the daemon
//!
//! Handlers are installed before the module is opened, so a SIGINT or
//! SIGTERM that arrives during the boot delay or the init handshake is
//! held and ends the main loop as soon as it starts.

use std::io;

use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::debug;

/// Registered SIGTERM and SIGINT streams
pub struct ShutdownSignal {
    sigterm: Signal,
    sigint: Signal,
}

impl ShutdownSignal {
    /// Register the handlers; must run inside a tokio runtime
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Wait for the next shutdown signal and return its name
    pub async fn wait(&mut self) -> &'static str {
        let name = tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        };
        debug!(signal = name, "shutdown signal received");
        name
    }
}
