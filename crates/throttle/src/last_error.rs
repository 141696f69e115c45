//! Single-slot holder for the most recent sink failure
//!
//! The flush loop overwrites the slot on every failed batch; the next
//! `push` takes it atomically, so one failure trips exactly one push.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use redlog_sinks::SinkError;

/// Read-and-clear sink failure slot
#[derive(Debug, Default)]
pub struct LastError {
    slot: ArcSwapOption<SinkError>,
}

impl LastError {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a failure, replacing any unread one
    pub fn set(&self, error: impl Into<Arc<SinkError>>) {
        self.slot.store(Some(error.into()));
    }

    /// Take the stored failure, leaving the slot empty
    pub fn take(&self) -> Option<Arc<SinkError>> {
        self.slot.swap(None)
    }

    /// Whether a failure is waiting to be taken
    pub fn is_set(&self) -> bool {
        self.slot.load().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears_slot() {
        let last_error = LastError::new();
        assert!(!last_error.is_set());
        assert!(last_error.take().is_none());

        last_error.set(SinkError::write("boom"));
        assert!(last_error.is_set());

        let taken = last_error.take().unwrap();
        assert!(taken.to_string().contains("boom"));
        assert!(!last_error.is_set());
        assert!(last_error.take().is_none());
    }

    #[test]
    fn test_set_overwrites_unread_error() {
        let last_error = LastError::new();
        last_error.set(SinkError::write("first"));
        last_error.set(SinkError::write("second"));

        let taken = last_error.take().unwrap();
        assert!(taken.to_string().contains("second"));
        assert!(last_error.take().is_none());
    }

    #[test]
    fn test_concurrent_take_yields_once() {
        let last_error = Arc::new(LastError::new());
        last_error.set(SinkError::Closed);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let last_error = Arc::clone(&last_error);
                std::thread::spawn(move || last_error.take().is_some())
            })
            .collect();

        let taken = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|taken| *taken)
            .count();
        assert_eq!(taken, 1);
    }
}
