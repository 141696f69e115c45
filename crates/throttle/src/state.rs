//! Throttler lifecycle state

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Linear lifecycle: `Created -> Started -> Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    /// Constructed, flush loop not running
    Created = 0,
    /// Flush loop running, pushes admitted
    Started = 1,
    /// Closed or aborted, terminal
    Closed = 2,
}

impl State {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Started,
            _ => Self::Closed,
        }
    }

    /// Lowercase name for logs
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Started => "started",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lock-free state cell shared by the throttler and its flush loop
#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub(crate) fn new(state: State) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    #[inline]
    pub(crate) fn load(&self) -> State {
        State::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move `from -> to`; on failure returns the current state
    pub(crate) fn transition(&self, from: State, to: State) -> Result<(), State> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(State::from_u8)
    }

    /// Store `state`, returning the previous one
    pub(crate) fn swap(&self, state: State) -> State {
        State::from_u8(self.0.swap(state as u8, Ordering::AcqRel))
    }
}
