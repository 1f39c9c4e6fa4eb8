//! The serial link to one module
//!
//! [`Link`] owns the transport, the session state and the event sink. The
//! [`CommandEngine`] drives it synchronously; while a recognition is
//! outstanding the link itself is attached to the transport as the byte
//! listener and decodes the result as it arrives.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{error, info, trace};

use crate::error::TransportError;
use crate::events::{DeviceEvent, EventSink};
use crate::protocol::frame::ACK;
use crate::state::{RecognitionKind, Session, SessionMode};
use crate::transport::{ByteListener, Transport};

mod engine;
pub mod reader;

pub use engine::{CommandDump, CommandEngine, TrainOutcome};

/// Shared link state, reachable from command callers and the reader thread
pub struct Link {
    transport: Arc<dyn Transport>,
    session: Mutex<Session>,
    events: Arc<dyn EventSink>,
    connected: AtomicBool,
    down: Notify,
}

impl Link {
    pub fn new(transport: Arc<dyn Transport>, events: Arc<dyn EventSink>) -> Self {
        Self {
            transport,
            session: Mutex::new(Session::new()),
            events,
            connected: AtomicBool::new(false),
            down: Notify::new(),
        }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn mode(&self) -> SessionMode {
        self.session.lock().mode()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub(crate) fn begin_recognition(&self, kind: RecognitionKind, group: u8) {
        self.session.lock().begin(kind, group);
    }

    /// Force the session back to idle
    pub(crate) fn force_idle(&self) {
        self.session.lock().reset();
    }

    /// Record that initialization succeeded
    pub fn mark_up(&self) {
        if !self.connected.swap(true, Ordering::SeqCst) {
            info!("link up");
            self.events.emit(DeviceEvent::Connection { connected: true });
        }
    }

    /// Record that the link is gone and wake the supervisor
    pub fn mark_down(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!("link down");
            self.events.emit(DeviceEvent::Connection { connected: false });
        }
        self.down.notify_one();
    }

    /// Resolves once the link has failed or been closed
    pub async fn wait_down(&self) {
        self.down.notified().await;
    }

    /// Tear the link down after a transport failure on the byte path
    fn fail(&self, error: TransportError) {
        error!(%error, "link failure");
        if let Err(e) = self.transport.detach_listener() {
            trace!(error = %e, "listener detach failed during teardown");
        }
        self.force_idle();
        if let Err(e) = self.transport.close() {
            trace!(error = %e, "transport close failed during teardown");
        }
        self.mark_down();
    }
}

impl ByteListener for Link {
    fn on_byte(&self, byte: u8) {
        if let Err(e) = self.transport.write(&[ACK]) {
            self.fail(e);
            return;
        }

        let mut session = self.session.lock();
        let Some(event) = session.feed(byte) else {
            return;
        };
        // Detach before anyone can see Idle and attach for a new recognition
        let detached = self.transport.detach_listener();
        drop(session);

        match detached {
            Ok(()) => self.events.emit(event),
            Err(e) => self.fail(e),
        }
    }

    fn on_error(&self, error: TransportError) {
        self.fail(error);
    }
}
