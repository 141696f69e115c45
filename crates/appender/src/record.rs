//! Structured log record handed to a layout

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::Level;

/// One log record before encoding
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// When the record was created
    pub timestamp: DateTime<Utc>,
    /// Severity
    pub level: Level,
    /// Module path or logger name
    pub target: String,
    /// Rendered message
    pub message: String,
    /// Extra key/value fields in emission order
    pub fields: Vec<(String, Value)>,
}

impl LogRecord {
    /// Create a record stamped with the current time
    pub fn new(level: Level, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            target: target.into(),
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Override the timestamp
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Append a field
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}
