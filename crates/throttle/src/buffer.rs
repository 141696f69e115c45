//! Bounded FIFO event buffer
//!
//! A tokio bounded channel split into a producer half that never blocks
//! (`offer`) and a consumer half owned by the flush loop that waits with a
//! timeout (`poll_timeout`).

use std::time::Duration;

use redlog_sinks::Event;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

/// Create a buffer holding at most `capacity` events
///
/// # Panics
///
/// Panics if `capacity` is 0; `ThrottlerConfig` rejects that value.
pub fn event_buffer(capacity: usize) -> (EventBuffer, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventBuffer { tx, capacity }, EventReceiver { rx })
}

/// Producer half, shared by every `push` caller
#[derive(Debug, Clone)]
pub struct EventBuffer {
    tx: mpsc::Sender<Event>,
    capacity: usize,
}

impl EventBuffer {
    /// Enqueue without waiting
    ///
    /// Returns false when the buffer is full or the receiver is gone.
    pub fn offer(&self, event: Event) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the receiving side has been closed or dropped
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Maximum number of buffered events
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events currently buffered
    #[inline]
    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    /// Whether nothing is buffered
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of a timed poll
#[derive(Debug, PartialEq, Eq)]
pub enum Polled {
    /// Next event in FIFO order
    Event(Event),
    /// The wait elapsed with nothing buffered
    Timeout,
    /// The buffer is closed and empty
    Closed,
}

/// Consumer half, owned by the flush loop
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<Event>,
}

impl EventReceiver {
    /// Wait up to `wait` for the next event
    ///
    /// A zero wait checks the buffer once without suspending.
    pub async fn poll_timeout(&mut self, wait: Duration) -> Polled {
        if wait.is_zero() {
            return match self.rx.try_recv() {
                Ok(event) => Polled::Event(event),
                Err(TryRecvError::Empty) => Polled::Timeout,
                Err(TryRecvError::Disconnected) => Polled::Closed,
            };
        }

        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(Some(event)) => Polled::Event(event),
            Ok(None) => Polled::Closed,
            Err(_) => Polled::Timeout,
        }
    }

    /// Take the next event if one is ready
    pub fn try_poll(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Refuse further offers; buffered events stay readable
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Events currently buffered
    #[inline]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether nothing is buffered
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
