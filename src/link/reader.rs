//! Flow-controlled reads
//!
//! The module holds back each output byte until the host acknowledges the
//! previous one with a space.

use std::time::Duration;

use tracing::trace;

use crate::error::TransportError;
use crate::protocol::frame::ACK;
use crate::transport::Transport;

/// Read up to `n` bytes, acknowledging each one
///
/// Stops early when a byte does not arrive within `timeout` and returns
/// what was collected; callers check the length. Hard transport errors are
/// returned as-is.
pub fn read_n(
    transport: &dyn Transport,
    n: usize,
    timeout: Duration,
) -> Result<Vec<u8>, TransportError> {
    let mut received = Vec::with_capacity(n);
    let mut byte = [0u8; 1];

    while received.len() < n {
        match transport.read_exact(&mut byte, timeout) {
            Ok(1) => {
                received.push(byte[0]);
                transport.write(&[ACK])?;
            }
            Ok(_) | Err(TransportError::Timeout) => {
                trace!(expected = n, received = received.len(), ?timeout, "read timed out");
                break;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(received)
}
