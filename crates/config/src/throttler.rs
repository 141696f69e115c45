//! Throttler configuration
//!
//! Controls buffering, batching and rate limiting of a single appender.
//!
//! `ThrottlerConfig` is immutable once built. The only way to obtain one is
//! `ThrottlerConfigBuilder::build()`, which validates every field, so an
//! invalid configuration never reaches a running throttler. TOML input is
//! deserialized through the builder and validated the same way.
//!
//! # Example
//!
//! ```toml
//! [appenders.throttler]
//! buffer_size = 500
//! batch_size = 100
//! flush_period = "1s"
//! max_events_per_second = 0
//! max_bytes_per_second = 0
//! max_errors_per_second = 0
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::rate::normalize_rate;

/// Default capacity of the pending-event buffer
pub const DEFAULT_BUFFER_SIZE: usize = 500;

/// Default number of events pushed to the sink at once
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default maximum wait before a partial batch is flushed
pub const DEFAULT_FLUSH_PERIOD: Duration = Duration::from_secs(1);

/// Validated, immutable throttler configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ThrottlerConfigBuilder")]
pub struct ThrottlerConfig {
    buffer_size: usize,
    batch_size: usize,
    flush_period: Duration,
    max_events_per_second: f64,
    max_bytes_per_second: f64,
    max_errors_per_second: f64,
    stats_name: Option<String>,
}

impl ThrottlerConfig {
    /// Start building a configuration from the defaults
    pub fn builder() -> ThrottlerConfigBuilder {
        ThrottlerConfigBuilder::default()
    }

    /// Capacity of the pending-event buffer
    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Maximum number of events per sink push
    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Maximum time the flush loop waits before flushing a partial batch
    #[inline]
    pub fn flush_period(&self) -> Duration {
        self.flush_period
    }

    /// Event admission rate, 0 = unlimited
    #[inline]
    pub fn max_events_per_second(&self) -> f64 {
        self.max_events_per_second
    }

    /// Byte admission rate, 0 = unlimited
    #[inline]
    pub fn max_bytes_per_second(&self) -> f64 {
        self.max_bytes_per_second
    }

    /// Rate at which admission failures are logged, 0 = unlimited
    #[inline]
    pub fn max_errors_per_second(&self) -> f64 {
        self.max_errors_per_second
    }

    /// Name under which the throttler statistics are registered
    #[inline]
    pub fn stats_name(&self) -> Option<&str> {
        self.stats_name.as_deref()
    }
}

impl Default for ThrottlerConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            flush_period: DEFAULT_FLUSH_PERIOD,
            max_events_per_second: 0.0,
            max_bytes_per_second: 0.0,
            max_errors_per_second: 0.0,
            stats_name: None,
        }
    }
}

impl TryFrom<ThrottlerConfigBuilder> for ThrottlerConfig {
    type Error = ConfigError;

    fn try_from(builder: ThrottlerConfigBuilder) -> Result<Self> {
        builder.build()
    }
}

/// Builder for [`ThrottlerConfig`]
///
/// Also the serde representation of the `[throttler]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThrottlerConfigBuilder {
    buffer_size: usize,
    batch_size: usize,
    #[serde(with = "humantime_serde")]
    flush_period: Duration,
    max_events_per_second: f64,
    max_bytes_per_second: f64,
    max_errors_per_second: f64,
    stats_name: Option<String>,
}

impl Default for ThrottlerConfigBuilder {
    fn default() -> Self {
        let defaults = ThrottlerConfig::default();
        Self {
            buffer_size: defaults.buffer_size,
            batch_size: defaults.batch_size,
            flush_period: defaults.flush_period,
            max_events_per_second: defaults.max_events_per_second,
            max_bytes_per_second: defaults.max_bytes_per_second,
            max_errors_per_second: defaults.max_errors_per_second,
            stats_name: defaults.stats_name,
        }
    }
}

impl ThrottlerConfigBuilder {
    /// Set the buffer capacity
    #[must_use]
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Set the batch size
    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the flush period
    #[must_use]
    pub fn flush_period(mut self, flush_period: Duration) -> Self {
        self.flush_period = flush_period;
        self
    }

    /// Set the event rate limit (0 disables it)
    #[must_use]
    pub fn max_events_per_second(mut self, rate: f64) -> Self {
        self.max_events_per_second = rate;
        self
    }

    /// Set the byte rate limit (0 disables it)
    #[must_use]
    pub fn max_bytes_per_second(mut self, rate: f64) -> Self {
        self.max_bytes_per_second = rate;
        self
    }

    /// Set the error logging rate limit (0 disables it)
    #[must_use]
    pub fn max_errors_per_second(mut self, rate: f64) -> Self {
        self.max_errors_per_second = rate;
        self
    }

    /// Set the statistics registration name
    #[must_use]
    pub fn stats_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.stats_name = if name.trim().is_empty() {
            None
        } else {
            Some(name)
        };
        self
    }

    /// Validate and build the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn build(self) -> Result<ThrottlerConfig> {
        let name = self.stats_name.clone().unwrap_or_else(|| "unnamed".into());

        if self.buffer_size == 0 {
            return Err(ConfigError::invalid_value(
                "throttler",
                name,
                "buffer_size",
                "expecting buffer_size > 0, found 0",
            ));
        }

        if self.batch_size == 0 || self.batch_size >= self.buffer_size {
            return Err(ConfigError::invalid_value(
                "throttler",
                name,
                "batch_size",
                format!(
                    "expecting 0 < batch_size < buffer_size ({}), found {}",
                    self.buffer_size, self.batch_size
                ),
            ));
        }

        if self.flush_period.is_zero() {
            return Err(ConfigError::invalid_value(
                "throttler",
                name,
                "flush_period",
                "expecting flush_period > 0",
            ));
        }

        for (field, rate) in [
            ("max_events_per_second", self.max_events_per_second),
            ("max_bytes_per_second", self.max_bytes_per_second),
            ("max_errors_per_second", self.max_errors_per_second),
        ] {
            if !rate.is_finite() || rate < 0.0 {
                return Err(ConfigError::invalid_value(
                    "throttler",
                    name,
                    field,
                    format!("expecting a finite rate >= 0, found {rate}"),
                ));
            }
            if rate > 0.0 && normalize_rate(rate).is_none() {
                return Err(ConfigError::invalid_value(
                    "throttler",
                    name,
                    field,
                    format!(
                        "expecting a rate between 0.000001 and {} per second, found {rate}",
                        u64::MAX
                    ),
                ));
            }
        }

        Ok(ThrottlerConfig {
            buffer_size: self.buffer_size,
            batch_size: self.batch_size,
            flush_period: self.flush_period,
            max_events_per_second: self.max_events_per_second,
            max_bytes_per_second: self.max_bytes_per_second,
            max_errors_per_second: self.max_errors_per_second,
            stats_name: self.stats_name,
        })
    }
}

#[cfg(test)]
#[path = "throttler_test.rs"]
mod throttler_test;
