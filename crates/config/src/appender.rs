//! Appender configuration
//!
//! An appender binds a layout, a Redis destination and a throttler under a
//! unique name.
//!
//! # Example
//!
//! ```toml
//! [[appenders]]
//! name = "orders"
//! ignore_exceptions = true
//! layout = "json"
//!
//! [appenders.redis]
//! key = "orders-logs"
//!
//! [appenders.throttler]
//! batch_size = 50
//! max_events_per_second = 100
//! ```

use serde::Deserialize;

use crate::redis::RedisConfig;
use crate::throttler::ThrottlerConfig;

/// How log records are encoded before being pushed
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    /// One JSON object per event (default)
    #[default]
    Json,
    /// Single text line per event
    Plain,
}

/// A single Redis appender
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppenderConfig {
    /// Unique appender name (required)
    pub name: String,

    /// Swallow and log admission failures instead of returning them
    /// Default: true
    pub ignore_exceptions: bool,

    /// Record encoding (json, plain)
    /// Default: json
    pub layout: LayoutKind,

    /// Destination settings
    pub redis: RedisConfig,

    /// Buffering and rate limiting settings
    pub throttler: ThrottlerConfig,
}

impl Default for AppenderConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            ignore_exceptions: true,
            layout: LayoutKind::Json,
            redis: RedisConfig::default(),
            throttler: ThrottlerConfig::default(),
        }
    }
}

impl AppenderConfig {
    /// Appender named `name` writing to `key`, everything else default
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            redis: RedisConfig::with_key(key),
            ..Self::default()
        }
    }

    /// Name the throttler statistics are registered under
    ///
    /// Falls back to `<name>/throttler` when the throttler section does not
    /// set one.
    pub fn stats_name(&self) -> String {
        self.throttler
            .stats_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/throttler", self.name))
    }
}
