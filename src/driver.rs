//! Host-side lifecycle for one module
//!
//! [`EasyVr::open`] waits for the module to boot and runs the initialization
//! handshake; [`EasyVr::run_until_shutdown`] parks until the supervisor asks
//! to stop or the link fails; [`EasyVr::close`] tears the link down.

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::DeviceConfig;
use crate::error::InitError;
use crate::events::EventSink;
use crate::link::{CommandEngine, Link};
use crate::transport::Transport;

/// Oldest module ID this driver supports
const MIN_DEVICE_ID: u8 = 2;

/// Why `run_until_shutdown` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Shutdown,
    LinkLost,
}

/// An initialized module
pub struct EasyVr {
    engine: CommandEngine,
}

impl EasyVr {
    /// Boot and initialize the module behind `transport`
    ///
    /// Blocks for the boot delay and the whole handshake. Emits
    /// `Connection(true)` on success.
    pub fn open(
        transport: Arc<dyn Transport>,
        events: Arc<dyn EventSink>,
        config: &DeviceConfig,
    ) -> Result<Self, InitError> {
        std::thread::sleep(config.boot_delay());

        let engine = CommandEngine::new(transport, events);
        if let Err(e) = Self::initialize(&engine, config) {
            error!(error = %e, "error initializing EasyVR");
            if let Err(e) = engine.link().transport().close() {
                warn!(error = %e, "failed to close transport");
            }
            return Err(e);
        }

        engine.link().mark_up();
        info!(
            level = config.level,
            knob = config.knob,
            language = ?config.language,
            "EasyVR initialized"
        );
        Ok(Self { engine })
    }

    fn initialize(engine: &CommandEngine, config: &DeviceConfig) -> Result<(), InitError> {
        engine.break_link().map_err(InitError::Handshake)?;
        engine.set_transmit_delay(0).map_err(InitError::TransmitDelay)?;
        let id = engine.identify().map_err(InitError::Identify)?;
        if id < MIN_DEVICE_ID {
            return Err(InitError::UnsupportedDevice(id));
        }
        engine
            .set_recognition_timeout(0)
            .map_err(InitError::RecognitionTimeout)?;
        engine.set_sd_level(config.level).map_err(InitError::SdLevel)?;
        engine.set_si_knob(config.knob).map_err(InitError::SiKnob)?;
        engine
            .set_si_language(config.language.code())
            .map_err(InitError::SiLanguage)?;
        Ok(())
    }

    /// Command interface to the module
    pub fn commands(&self) -> &CommandEngine {
        &self.engine
    }

    pub fn link(&self) -> &Arc<Link> {
        self.engine.link()
    }

    /// Wait for `shutdown` to resolve or the link to fail
    pub async fn run_until_shutdown<F: Future>(&self, shutdown: F) -> RunOutcome {
        tokio::select! {
            _ = shutdown => {
                info!("shutdown requested");
                RunOutcome::Shutdown
            }
            _ = self.link().wait_down() => {
                warn!("link lost");
                RunOutcome::LinkLost
            }
        }
    }

    /// Close the link; emits `Connection(false)` if it was up
    pub fn close(&self) {
        let link = self.link();
        if let Err(e) = link.transport().detach_listener() {
            warn!(error = %e, "failed to detach listener");
        }
        link.force_idle();
        if let Err(e) = link.transport().close() {
            warn!(error = %e, "failed to close transport");
        }
        link.mark_down();
    }
}
