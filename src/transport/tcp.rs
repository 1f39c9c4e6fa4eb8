//! Transport over a TCP serial bridge (ser2net and friends)
//!
//! A dedicated reader thread pulls bytes off the socket and routes each one
//! either to the attached listener or into a queue drained by `read_exact`.
//! The queue is bounded; bytes arriving while it is full are dropped.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use super::{ByteListener, Transport};
use crate::error::TransportError;

/// Bytes buffered for synchronous reads; longest response is far shorter
const INBOUND_CAPACITY: usize = 1024;

type ListenerSlot = Arc<Mutex<Option<Arc<dyn ByteListener>>>>;

/// Input queued for synchronous reads
enum Inbound {
    Byte(u8),
    Failed(io::ErrorKind),
    Eof,
}

pub struct TcpTransport {
    writer: Mutex<TcpStream>,
    inbound: Mutex<Receiver<Inbound>>,
    listener: ListenerSlot,
    closed: Arc<AtomicBool>,
}

impl TcpTransport {
    /// Connect to the bridge and start the reader thread
    pub fn connect<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let reader = stream.try_clone()?;

        let (tx, rx) = mpsc::sync_channel(INBOUND_CAPACITY);
        let listener: ListenerSlot = Arc::new(Mutex::new(None));
        let closed = Arc::new(AtomicBool::new(false));

        {
            let listener = Arc::clone(&listener);
            let closed = Arc::clone(&closed);
            thread::Builder::new()
                .name("easyvr-reader".to_string())
                .spawn(move || {
                    debug!("reader thread started");
                    run_reader(reader, tx, listener, closed);
                    debug!("reader thread stopped");
                })?;
        }

        info!(peer = ?stream.peer_addr().ok(), "serial bridge connected");

        Ok(Self {
            writer: Mutex::new(stream),
            inbound: Mutex::new(rx),
            listener,
            closed,
        })
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Transport for TcpTransport {
    fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        self.ensure_open()?;
        let mut writer = self.writer.lock();
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(())
    }

    fn read_exact(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        self.ensure_open()?;
        let inbound = self.inbound.lock();
        for i in 0..buf.len() {
            match inbound.recv_timeout(timeout) {
                Ok(Inbound::Byte(b)) => buf[i] = b,
                Ok(Inbound::Failed(kind)) => return Err(io::Error::from(kind).into()),
                Ok(Inbound::Eof) | Err(RecvTimeoutError::Disconnected) => {
                    return Err(TransportError::Closed)
                }
                Err(RecvTimeoutError::Timeout) if i == 0 => return Err(TransportError::Timeout),
                Err(RecvTimeoutError::Timeout) => return Ok(i),
            }
        }
        Ok(buf.len())
    }

    fn clear_input_buffer(&self) -> Result<(), TransportError> {
        self.ensure_open()?;
        let inbound = self.inbound.lock();
        let mut discarded = 0usize;
        loop {
            match inbound.try_recv() {
                Ok(Inbound::Byte(_)) => discarded += 1,
                Ok(Inbound::Failed(kind)) => return Err(io::Error::from(kind).into()),
                Ok(Inbound::Eof) | Err(TryRecvError::Disconnected) => {
                    return Err(TransportError::Closed)
                }
                Err(TryRecvError::Empty) => break,
            }
        }
        if discarded > 0 {
            trace!(discarded, "stale input discarded");
        }
        Ok(())
    }

    fn attach_listener(&self, listener: Arc<dyn ByteListener>) -> Result<(), TransportError> {
        self.ensure_open()?;
        *self.listener.lock() = Some(listener);
        Ok(())
    }

    fn detach_listener(&self) -> Result<(), TransportError> {
        self.listener.lock().take();
        Ok(())
    }

    fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.listener.lock().take();
        match self.writer.lock().shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e.into()),
            _ => {
                info!("serial bridge closed");
                Ok(())
            }
        }
    }
}

/// Reader loop; exits on EOF, error or close
fn run_reader(
    mut stream: TcpStream,
    queue: SyncSender<Inbound>,
    listener: ListenerSlot,
    closed: Arc<AtomicBool>,
) {
    let mut buf = [0u8; 64];
    loop {
        let failure = match stream.read(&mut buf) {
            Ok(0) => None,
            Ok(n) => {
                let mut dropped = 0usize;
                for &b in &buf[..n] {
                    // Clone out of the slot so the listener may detach itself
                    let current = listener.lock().clone();
                    match current {
                        Some(l) => l.on_byte(b),
                        None => match queue.try_send(Inbound::Byte(b)) {
                            Ok(()) => {}
                            Err(TrySendError::Full(_)) => dropped += 1,
                            Err(TrySendError::Disconnected(_)) => return,
                        },
                    }
                }
                if dropped > 0 {
                    warn!(dropped, capacity = INBOUND_CAPACITY, "input queue full, bytes dropped");
                }
                continue;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => Some(e),
        };

        if closed.load(Ordering::SeqCst) {
            return;
        }

        let current = listener.lock().clone();
        match (current, failure) {
            (Some(l), Some(e)) => l.on_error(e.into()),
            (Some(l), None) => l.on_error(TransportError::Closed),
            (None, Some(e)) => {
                warn!(error = %e, "serial bridge read failed");
                // a full queue still reports Closed once this sender drops
                let _ = queue.try_send(Inbound::Failed(e.kind()));
            }
            (None, None) => {
                warn!("serial bridge disconnected");
                let _ = queue.try_send(Inbound::Eof);
            }
        }
        return;
    }
}
