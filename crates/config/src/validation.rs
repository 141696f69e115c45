//! Configuration validation
//!
//! Throttler settings are validated while parsing. This pass covers what a
//! single section cannot check on its own:
//! - Appender names are present and unique
//! - Every appender has a Redis key
//! - Redis host, port and timeouts are usable

use crate::Config;
use crate::appender::AppenderConfig;
use crate::error::{ConfigError, Result};
use std::collections::HashSet;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let mut seen = HashSet::new();

    for appender in &config.appenders {
        validate_appender(appender)?;

        if !seen.insert(appender.name.as_str()) {
            return Err(ConfigError::duplicate_appender(&appender.name));
        }
    }

    Ok(())
}

/// Validate a single appender and its Redis section
pub fn validate_appender(appender: &AppenderConfig) -> Result<()> {
    if appender.name.trim().is_empty() {
        return Err(ConfigError::missing_field("appender", "<unnamed>", "name"));
    }

    let name = appender.name.as_str();
    let redis = &appender.redis;

    if redis.key_str().trim().is_empty() {
        return Err(ConfigError::missing_field("redis", name, "key"));
    }

    if redis.host.trim().is_empty() {
        return Err(ConfigError::missing_field("redis", name, "host"));
    }

    if redis.port == 0 {
        return Err(ConfigError::invalid_value(
            "redis",
            name,
            "port",
            "expecting port > 0",
        ));
    }

    if redis.connection_timeout.is_zero() {
        return Err(ConfigError::invalid_value(
            "redis",
            name,
            "connection_timeout",
            "expecting connection_timeout > 0",
        ));
    }

    if redis.socket_timeout.is_zero() {
        return Err(ConfigError::invalid_value(
            "redis",
            name,
            "socket_timeout",
            "expecting socket_timeout > 0",
        ));
    }

    Ok(())
}
