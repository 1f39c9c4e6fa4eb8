//! Byte transport between the host and the module
//!
//! Opening and configuring the physical port is the caller's business; the
//! driver only needs these primitives. Bytes reach the driver either through
//! blocking [`Transport::read_exact`] calls or, while a listener is attached,
//! pushed one at a time to [`ByteListener::on_byte`]. Never both at once.

use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;

#[cfg(test)]
pub(crate) mod scripted;
mod tcp;

pub use tcp::TcpTransport;

/// Receives bytes pushed by the transport's reader
pub trait ByteListener: Send + Sync {
    /// Called once per received byte, in arrival order
    fn on_byte(&self, byte: u8);

    /// Called when the reader hits an error or the peer disconnects
    fn on_error(&self, error: TransportError);
}

/// Half-duplex byte link
pub trait Transport: Send + Sync {
    fn write(&self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Fill `buf`, waiting up to `timeout` for each byte
    ///
    /// Returns the number of bytes read, which is short when the data
    /// stops arriving part way. Fails with [`TransportError::Timeout`] when
    /// nothing arrived at all.
    fn read_exact(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError>;

    /// Discard any input received but not yet read
    fn clear_input_buffer(&self) -> Result<(), TransportError>;

    fn attach_listener(&self, listener: Arc<dyn ByteListener>) -> Result<(), TransportError>;

    fn detach_listener(&self) -> Result<(), TransportError>;

    fn close(&self) -> Result<(), TransportError>;
}
