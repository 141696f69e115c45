//! Fixed-window rate limiter
//!
//! A rate in permits per second is normalized to a whole number of permits
//! per cycle, where the cycle is a power of ten seconds. The rate is
//! rendered with six fractional digits (locale-independent) and trailing
//! zeros are dropped; the remaining digits become the permit count and the
//! number of fractional digits picks the cycle:
//!
//! | rate | permits | cycle |
//! |------|---------|-------|
//! | `100` | 100 | 1s |
//! | `2.5` | 25 | 10s |
//! | `0.1` | 1 | 10s |
//! | `0.05` | 5 | 100s |
//!
//! so the budget is exact, with no floating point accumulation.
//!
//! `try_acquire` never blocks. A rate of 0 disables the limiter.

use std::time::Duration;

use parking_lot::Mutex;
use redlog_config::normalize_rate;
use tokio::time::Instant;

use crate::error::RateLimitError;

/// Non-blocking fixed-window rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    max_permits_per_second: f64,
    permits_per_cycle: u64,
    cycle: Duration,
    window: Mutex<Window>,
}

#[derive(Debug)]
struct Window {
    started: Option<Instant>,
    used: u64,
}

impl RateLimiter {
    /// Create a limiter for `max_permits_per_second`, 0 = unlimited
    ///
    /// # Errors
    ///
    /// `InvalidRate` for negative or non-finite rates, `Unrepresentable`
    /// for positive rates below one permit per million seconds or too large
    /// to count.
    pub fn new(max_permits_per_second: f64) -> Result<Self, RateLimitError> {
        if !max_permits_per_second.is_finite() || max_permits_per_second < 0.0 {
            return Err(RateLimitError::InvalidRate(max_permits_per_second));
        }

        let (permits_per_cycle, cycle) = if max_permits_per_second == 0.0 {
            (0, Duration::ZERO)
        } else {
            normalize(max_permits_per_second)?
        };

        Ok(Self {
            max_permits_per_second,
            permits_per_cycle,
            cycle,
            window: Mutex::new(Window {
                started: None,
                used: 0,
            }),
        })
    }

    /// A limiter that admits everything
    pub fn unlimited() -> Self {
        Self {
            max_permits_per_second: 0.0,
            permits_per_cycle: 0,
            cycle: Duration::ZERO,
            window: Mutex::new(Window {
                started: None,
                used: 0,
            }),
        }
    }

    /// Whether the limiter admits everything
    #[inline]
    pub fn is_unlimited(&self) -> bool {
        self.permits_per_cycle == 0
    }

    /// Configured rate
    #[inline]
    pub fn max_permits_per_second(&self) -> f64 {
        self.max_permits_per_second
    }

    /// Whole permits available per cycle
    #[inline]
    pub fn permits_per_cycle(&self) -> u64 {
        self.permits_per_cycle
    }

    /// Cycle length
    #[inline]
    pub fn cycle(&self) -> Duration {
        self.cycle
    }

    /// Take `cost` permits from the current cycle if available
    ///
    /// A cost larger than a whole cycle's budget is always denied.
    pub fn try_acquire(&self, cost: u64) -> bool {
        if self.is_unlimited() {
            return true;
        }
        if cost > self.permits_per_cycle {
            return false;
        }

        let now = Instant::now();
        let mut window = self.window.lock();

        let expired = window
            .started
            .is_none_or(|started| now.duration_since(started) >= self.cycle);
        if expired {
            window.started = Some(now);
            window.used = 0;
        }

        if cost <= self.permits_per_cycle - window.used {
            window.used += cost;
            true
        } else {
            false
        }
    }
}

fn normalize(rate: f64) -> Result<(u64, Duration), RateLimitError> {
    normalize_rate(rate).ok_or(RateLimitError::Unrepresentable(rate))
}

#[cfg(test)]
#[path = "rate_limiter_test.rs"]
mod rate_limiter_test;
