//! easyvr: driver for EasyVR speech recognition modules
//!
//! The module speaks a half-duplex serial protocol:
//! - Synchronous commands with per-byte flow control, serialized by one lock
//! - Asynchronous recognition results decoded byte by byte as they arrive
//! - Domain events delivered through a caller-supplied [`EventSink`]
//!
//! Opening the physical port is left to the caller; anything implementing
//! [`Transport`] will do.

pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod link;
pub mod protocol;
pub mod state;
pub mod transport;

pub use config::{Config, DeviceConfig, Language};
pub use driver::{EasyVr, RunOutcome};
pub use error::{CommandError, InitError, ProtocolError, TransportError};
pub use events::{DeviceEvent, EventSink};
pub use link::{CommandDump, CommandEngine, Link, TrainOutcome};
pub use state::{RecognitionKind, SessionMode};
pub use transport::{ByteListener, TcpTransport, Transport};
