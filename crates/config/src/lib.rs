//! Redlog Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Only the Redis key and the appender name are required.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use redlog_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str(
//!     "[[appenders]]\nname = \"app\"\n[appenders.redis]\nkey = \"logs\"",
//! )
//! .unwrap();
//! assert_eq!(config.appenders.len(), 1);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [metrics]
//! interval = "30s"
//!
//! [[appenders]]
//! name = "app"
//! layout = "json"
//!
//! [appenders.redis]
//! host = "localhost"
//! key = "app-logs"
//!
//! [appenders.throttler]
//! buffer_size = 1000
//! batch_size = 200
//! flush_period = "500ms"
//! max_events_per_second = 500
//! ```

mod appender;
mod error;
mod logging;
mod metrics;
mod rate;
mod redis;
mod throttler;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use appender::{AppenderConfig, LayoutKind};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use metrics::{MetricsConfig, MetricsFormat};
pub use rate::normalize_rate;
pub use redis::RedisConfig;
pub use throttler::{
    DEFAULT_BATCH_SIZE, DEFAULT_BUFFER_SIZE, DEFAULT_FLUSH_PERIOD, ThrottlerConfig,
    ThrottlerConfigBuilder,
};
pub use validation::validate_appender;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Internal logging configuration
    pub log: LogConfig,

    /// Statistics reporting configuration
    pub metrics: MetricsConfig,

    /// Redis appenders
    pub appenders: Vec<AppenderConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Look up an appender by name
    pub fn appender(&self, name: &str) -> Option<&AppenderConfig> {
        self.appenders.iter().find(|a| a.name == name)
    }

    /// Names of every configured appender, in file order
    pub fn appender_names(&self) -> Vec<&str> {
        self.appenders.iter().map(|a| a.name.as_str()).collect()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
