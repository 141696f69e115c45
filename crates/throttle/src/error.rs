//! Throttler error types

use std::sync::Arc;

use redlog_sinks::SinkError;
use thiserror::Error;

/// Result type for throttler operations
pub type Result<T> = std::result::Result<T, ThrottleError>;

/// Rate limiter construction errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateLimitError {
    /// Negative, NaN or infinite rate
    #[error("expecting a finite rate >= 0, found {0}")]
    InvalidRate(f64),

    /// Positive rate that rounds to zero or overflows the permit counter
    #[error("rate {0} cannot be expressed as whole permits per cycle")]
    Unrepresentable(f64),
}

/// Errors surfaced by the throttler
///
/// Admission errors (`NotStarted` through `BufferFull`) are returned from
/// `push` only when exceptions are not ignored.
#[derive(Debug, Error)]
pub enum ThrottleError {
    /// Pushed before `start`
    #[error("throttler is not started")]
    NotStarted,

    /// Pushed after `close`
    #[error("throttler is closed")]
    Closed,

    /// A previous batch failed; this event was ignored
    #[error("previous push to sink failed: {0}")]
    SinkFailure(Arc<SinkError>),

    /// Event rate limit exceeded
    #[error("event rate limit of {max_per_second}/s exceeded")]
    EventRateLimited {
        /// Configured limit
        max_per_second: f64,
    },

    /// Byte rate limit exceeded
    #[error("byte rate limit of {max_per_second} B/s exceeded by a {size} byte event")]
    ByteRateLimited {
        /// Configured limit
        max_per_second: f64,
        /// Size of the rejected event
        size: usize,
    },

    /// The buffer had no free slot
    #[error("buffer full ({capacity} events)")]
    BufferFull {
        /// Buffer capacity
        capacity: usize,
    },

    /// `start` called twice
    #[error("throttler is already started")]
    AlreadyStarted,

    /// `start` called outside a tokio runtime
    #[error("no tokio runtime available to run the flush loop")]
    NoRuntime,

    /// A configured rate cannot be enforced
    #[error("invalid rate limit: {0}")]
    RateLimit(#[from] RateLimitError),
}

impl ThrottleError {
    /// Whether this is a per-event admission failure
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            Self::NotStarted
                | Self::Closed
                | Self::SinkFailure(_)
                | Self::EventRateLimited { .. }
                | Self::ByteRateLimited { .. }
                | Self::BufferFull { .. }
        )
    }
}
