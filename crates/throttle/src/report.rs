//! Admission failure reporting
//!
//! In strict mode every failure goes back to the caller. Otherwise the
//! failure is logged, at most `max_errors_per_second` times per second;
//! failures over that budget are counted and the count rides along on the
//! next line that does get logged.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::error;

use crate::error::{Result, ThrottleError};
use crate::rate_limiter::RateLimiter;

/// Routes admission failures to the caller or to the log
#[derive(Debug)]
pub struct ErrorReporter {
    name: String,
    strict: bool,
    limiter: RateLimiter,
    suppressed: AtomicU64,
    logged: AtomicU64,
}

impl ErrorReporter {
    /// Create a reporter; `strict` returns failures instead of logging them
    pub fn new(name: impl Into<String>, strict: bool, limiter: RateLimiter) -> Self {
        Self {
            name: name.into(),
            strict,
            limiter,
            suppressed: AtomicU64::new(0),
            logged: AtomicU64::new(0),
        }
    }

    /// Switch between strict and permissive reporting
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Whether failures are returned to the caller
    #[inline]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Report one failure
    ///
    /// # Errors
    ///
    /// Returns `err` unchanged in strict mode.
    pub fn report(&self, err: ThrottleError) -> Result<()> {
        if self.strict {
            return Err(err);
        }

        if self.limiter.try_acquire(1) {
            let suppressed = self.suppressed.swap(0, Ordering::Relaxed);
            self.logged.fetch_add(1, Ordering::Relaxed);
            if suppressed > 0 {
                error!(
                    throttler = %self.name,
                    error = %err,
                    suppressed_count = suppressed,
                    "event dropped (rate-limited)"
                );
            } else {
                error!(throttler = %self.name, error = %err, "event dropped");
            }
        } else {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Failures not logged since the last logged one
    pub fn suppressed(&self) -> u64 {
        self.suppressed.load(Ordering::Relaxed)
    }

    /// Failures logged so far
    pub fn logged(&self) -> u64 {
        self.logged.load(Ordering::Relaxed)
    }
}
