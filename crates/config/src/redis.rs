//! Redis destination configuration
//!
//! # Example
//!
//! ```toml
//! [appenders.redis]
//! host = "localhost"
//! port = 6379
//! database = 0
//! key = "logs"
//! connection_timeout = "2s"
//! socket_timeout = "2s"
//! ```

use serde::Deserialize;
use std::time::Duration;

/// Redis connection and destination list
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RedisConfig {
    /// Server hostname
    /// Default: localhost
    pub host: String,

    /// Server port
    /// Default: 6379
    pub port: u16,

    /// Logical database selected after connecting
    /// Default: 0
    pub database: u32,

    /// Password sent with AUTH, if any
    pub password: Option<String>,

    /// List key events are appended to (required)
    pub key: Option<String>,

    /// Maximum time to establish a connection
    /// Default: 2s
    #[serde(with = "humantime_serde")]
    pub connection_timeout: Duration,

    /// Maximum time for a single write or reply
    /// Default: 2s
    #[serde(with = "humantime_serde")]
    pub socket_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 6379,
            database: 0,
            password: None,
            key: None,
            connection_timeout: Duration::from_secs(2),
            socket_timeout: Duration::from_secs(2),
        }
    }
}

impl RedisConfig {
    /// Configuration for `key` with every other field at its default
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    /// `host:port` address string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Destination key, empty when unset
    pub fn key_str(&self) -> &str {
        self.key.as_deref().unwrap_or_default()
    }
}
