//! Error types for the link, the command engine and device initialization

use std::io;

use thiserror::Error;

/// Failures reported by a [`Transport`](crate::transport::Transport)
#[derive(Debug, Error)]
pub enum TransportError {
    /// Expected bytes did not arrive in time
    #[error("timed out waiting for data")]
    Timeout,

    /// I/O failure reading or writing the link
    #[error("link I/O error: {0}")]
    Io(#[from] io::Error),

    /// The link has been closed
    #[error("link closed")]
    Closed,
}

/// The device answered, but not in the way the command expects
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unexpected response to '{command}': 0x{byte:02X}")]
    UnexpectedResponse { command: char, byte: u8 },

    #[error("label length mismatch: announced {expected} bytes, received {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("label ends with a dangling escape byte")]
    DanglingEscape,

    #[error("argument byte 0x{0:02X} out of range")]
    ArgumentOutOfRange(u8),
}

/// Why a synchronous command failed
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Fewer response bytes arrived than the command requires
    #[error("response to '{command}' timed out after {received} of {expected} bytes")]
    Timeout {
        command: char,
        expected: usize,
        received: usize,
    },

    /// An argument does not fit the one-byte encoding; nothing was sent
    #[error("{name} out of range: {value}")]
    InvalidArgument { name: &'static str, value: i32 },

    /// No acknowledgement to any of the break attempts
    #[error("no break acknowledgement after {attempts} attempts")]
    BreakFailed { attempts: usize },
}

/// A step of the device initialization sequence failed
#[derive(Debug, Error)]
pub enum InitError {
    #[error("handshake error")]
    Handshake(#[source] CommandError),

    #[error("transmit delay setting error")]
    TransmitDelay(#[source] CommandError),

    #[error("device identification error")]
    Identify(#[source] CommandError),

    #[error("device ID mismatch: {0}")]
    UnsupportedDevice(u8),

    #[error("timeout setting error")]
    RecognitionTimeout(#[source] CommandError),

    #[error("SD strictness level setting error")]
    SdLevel(#[source] CommandError),

    #[error("SI strictness level setting error")]
    SiKnob(#[source] CommandError),

    #[error("SI language setting error")]
    SiLanguage(#[source] CommandError),
}
