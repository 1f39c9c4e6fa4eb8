//! Domain events emitted by the driver
//!
//! Delivery is up to the caller: anything implementing [`EventSink`] can
//! receive them.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::trace;

use crate::state::RecognitionKind;

/// Events emitted on link state changes and recognition outcomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// Link came up after initialization, or went down
    Connection { connected: bool },

    /// Built-in word recognition finished
    WordRecognized {
        /// Group the recognition was started for
        group: u8,
        /// Recognized word index, or a negative error code
        value: i32,
    },

    /// Custom command recognition finished
    CommandRecognized {
        /// Group the recognition was started for
        group: u8,
        /// Recognized command position, or a negative error code
        value: i32,
    },
}

impl DeviceEvent {
    pub fn recognized(kind: RecognitionKind, group: u8, value: i32) -> Self {
        match kind {
            RecognitionKind::Word => DeviceEvent::WordRecognized { group, value },
            RecognitionKind::Command => DeviceEvent::CommandRecognized { group, value },
        }
    }

    /// Stable identifier, e.g. `recog.sd(3)`
    pub fn id(&self) -> String {
        match self {
            DeviceEvent::Connection { .. } => "connection".to_string(),
            DeviceEvent::WordRecognized { group, .. } => format!("recog.si({})", group),
            DeviceEvent::CommandRecognized { group, .. } => format!("recog.sd({})", group),
        }
    }
}

impl std::fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceEvent::Connection { connected } => write!(f, "{} = {}", self.id(), connected),
            DeviceEvent::WordRecognized { value, .. }
            | DeviceEvent::CommandRecognized { value, .. } => {
                write!(f, "{} = {}", self.id(), value)
            }
        }
    }
}

/// Receives events from the driver; called from whichever thread produced them
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DeviceEvent);
}

impl EventSink for broadcast::Sender<DeviceEvent> {
    fn emit(&self, event: DeviceEvent) {
        if self.send(event).is_err() {
            trace!("no event subscribers");
        }
    }
}

impl EventSink for mpsc::UnboundedSender<DeviceEvent> {
    fn emit(&self, event: DeviceEvent) {
        if self.send(event).is_err() {
            trace!("event receiver dropped");
        }
    }
}
