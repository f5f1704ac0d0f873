//! # Channel Abstraction
//!
//! Moves whole messages between two endpoints. A channel knows nothing about
//! envelopes or ids; it delivers opaque buffers, each exactly as sent.
//!
//! Inbound delivery is push-based: the endpoint registers one handler and
//! the channel calls it for every message, in arrival order, from whatever
//! context the channel reads on. Handlers must not assume a runtime.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::thread;

use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The other end went away.
    Closed,
    /// `on_incoming` was already called on this channel.
    HandlerTaken,
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "Channel closed"),
            Self::HandlerTaken => write!(f, "Inbound handler already registered"),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Called once per inbound message.
pub type Handler = Box<dyn Fn(Vec<u8>) + Send + 'static>;

/// A bidirectional message pipe.
///
/// This trait is object-safe (`Arc<dyn Channel>`).
pub trait Channel: Send + Sync + 'static {
    /// Queues one message for the peer. Must not block on the peer's handler.
    fn send(&self, message: Vec<u8>) -> Result<()>;

    /// Installs the inbound handler. A channel accepts exactly one.
    fn on_incoming(&self, handler: Handler) -> Result<()>;
}

/// In-process channel pair over tokio unbounded mpsc.
///
/// Messages sent before the peer registers its handler are queued. Delivery
/// runs on a dedicated thread per endpoint, so handlers may block.
pub struct MemoryChannel {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl MemoryChannel {
    /// Creates two channels connected to each other.
    ///
    /// Messages sent on `a` are received by `b` and vice versa.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();

        let a = Self {
            tx: tx_a,
            rx: Mutex::new(Some(rx_b)),
        };

        let b = Self {
            tx: tx_b,
            rx: Mutex::new(Some(rx_a)),
        };

        (a, b)
    }
}

impl Channel for MemoryChannel {
    fn send(&self, message: Vec<u8>) -> Result<()> {
        self.tx.send(message).map_err(|_| Error::Closed)
    }

    fn on_incoming(&self, handler: Handler) -> Result<()> {
        let rx = self.rx.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(mut rx) = rx else {
            return Err(Error::HandlerTaken);
        };

        thread::Builder::new()
            .name("treerpc-inbound".into())
            .spawn(move || {
                while let Some(message) = rx.blocking_recv() {
                    handler(message);
                }
                debug!("memory channel peer closed");
            })
            .map_err(|e| Error::Io(e.to_string()))?;

        Ok(())
    }
}
