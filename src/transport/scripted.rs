//! In-memory transport for tests
//!
//! Records every write call and serves reads from a script. An optional
//! responder plays the device: it sees each non-acknowledgement write and
//! returns the bytes the device would answer with.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{ByteListener, Transport};
use crate::error::TransportError;
use crate::protocol::frame::ACK;

/// One scripted outcome of a single-byte read
#[derive(Debug, Clone, Copy)]
pub(crate) enum Scripted {
    Byte(u8),
    Timeout,
    Fail,
}

type Responder = Box<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>;
type Hook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    input: Mutex<VecDeque<Scripted>>,
    writes: Mutex<Vec<Vec<u8>>>,
    listener: Mutex<Option<Arc<dyn ByteListener>>>,
    responder: Option<Responder>,
    on_detach: Mutex<Option<Hook>>,
    fail_writes: Mutex<bool>,
    clears: Mutex<usize>,
    attaches: Mutex<usize>,
    closed: Mutex<bool>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::default()
        }
    }

    /// Queue bytes for synchronous reads
    pub(crate) fn respond(&self, bytes: &[u8]) {
        self.input
            .lock()
            .extend(bytes.iter().map(|&b| Scripted::Byte(b)));
    }

    pub(crate) fn script(&self, reads: &[Scripted]) {
        self.input.lock().extend(reads.iter().copied());
    }

    /// Deliver bytes the way the reader thread would
    pub(crate) fn push(&self, bytes: &[u8]) {
        for &b in bytes {
            let current = self.listener.lock().clone();
            match current {
                Some(l) => l.on_byte(b),
                None => self.input.lock().push_back(Scripted::Byte(b)),
            }
        }
    }

    /// Report a reader failure to the attached listener
    pub(crate) fn disconnect(&self) {
        let current = self.listener.lock().clone();
        if let Some(l) = current {
            l.on_error(TransportError::Closed);
        }
    }

    /// Run `hook` inside the next detach, before the listener is removed
    pub(crate) fn on_next_detach<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        *self.on_detach.lock() = Some(Box::new(hook));
    }

    pub(crate) fn fail_writes(&self) {
        *self.fail_writes.lock() = true;
    }

    pub(crate) fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().clone()
    }

    /// Write calls other than flow-control acknowledgements
    pub(crate) fn frames(&self) -> Vec<Vec<u8>> {
        self.writes
            .lock()
            .iter()
            .filter(|w| w.as_slice() != [ACK])
            .cloned()
            .collect()
    }

    pub(crate) fn acks(&self) -> usize {
        self.writes
            .lock()
            .iter()
            .filter(|w| w.as_slice() == [ACK])
            .count()
    }

    pub(crate) fn clears(&self) -> usize {
        *self.clears.lock()
    }

    pub(crate) fn attaches(&self) -> usize {
        *self.attaches.lock()
    }

    pub(crate) fn has_listener(&self) -> bool {
        self.listener.lock().is_some()
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}

impl Transport for ScriptedTransport {
    fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        if *self.fail_writes.lock() {
            return Err(TransportError::Closed);
        }
        self.writes.lock().push(bytes.to_vec());
        if bytes != [ACK] {
            if let Some(responder) = &self.responder {
                self.respond(&responder(bytes));
            }
        }
        Ok(())
    }

    fn read_exact(&self, buf: &mut [u8], _timeout: Duration) -> Result<usize, TransportError> {
        let mut input = self.input.lock();
        for i in 0..buf.len() {
            match input.pop_front() {
                Some(Scripted::Byte(b)) => buf[i] = b,
                Some(Scripted::Fail) => {
                    return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into())
                }
                Some(Scripted::Timeout) | None if i == 0 => return Err(TransportError::Timeout),
                Some(Scripted::Timeout) | None => return Ok(i),
            }
        }
        Ok(buf.len())
    }

    fn clear_input_buffer(&self) -> Result<(), TransportError> {
        *self.clears.lock() += 1;
        Ok(())
    }

    fn attach_listener(&self, listener: Arc<dyn ByteListener>) -> Result<(), TransportError> {
        *self.attaches.lock() += 1;
        *self.listener.lock() = Some(listener);
        Ok(())
    }

    fn detach_listener(&self) -> Result<(), TransportError> {
        let hook = self.on_detach.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        self.listener.lock().take();
        Ok(())
    }

    fn close(&self) -> Result<(), TransportError> {
        *self.closed.lock() = true;
        self.listener.lock().take();
        Ok(())
    }
}
