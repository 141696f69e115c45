//! Layouts encode a [`LogRecord`] into the bytes pushed to Redis
//!
//! | Layout | Output |
//! |--------|--------|
//! | `json` | `{"timestamp":"...","level":"INFO","target":"...","message":"...","fields":{...}}` |
//! | `plain` | `2024-01-01T00:00:00.000Z INFO target: message key=value` |

use std::fmt::Write as _;
use std::sync::Arc;

use bytes::Bytes;
use chrono::SecondsFormat;
use redlog_config::LayoutKind;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::record::LogRecord;

/// Encodes records into event payloads
pub trait Layout: Send + Sync {
    /// Layout name for diagnostics
    fn name(&self) -> &'static str;

    /// Encode one record
    fn encode(&self, record: &LogRecord) -> Result<Bytes>;
}

/// Build the layout selected in configuration
pub fn layout_for(kind: LayoutKind) -> Arc<dyn Layout> {
    match kind {
        LayoutKind::Json => Arc::new(JsonLayout),
        LayoutKind::Plain => Arc::new(PlainLayout),
    }
}

fn timestamp(record: &LogRecord) -> String {
    record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// One JSON object per record
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLayout;

#[derive(Serialize)]
struct JsonRecord<'a> {
    timestamp: String,
    level: &'a str,
    target: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Map::is_empty")]
    fields: Map<String, Value>,
}

impl Layout for JsonLayout {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, record: &LogRecord) -> Result<Bytes> {
        let fields = record
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let json = JsonRecord {
            timestamp: timestamp(record),
            level: record.level.as_str(),
            target: &record.target,
            message: &record.message,
            fields,
        };
        Ok(Bytes::from(serde_json::to_vec(&json)?))
    }
}

/// Single human-readable line per record
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainLayout;

impl Layout for PlainLayout {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn encode(&self, record: &LogRecord) -> Result<Bytes> {
        let mut line = format!(
            "{} {} {}: {}",
            timestamp(record),
            record.level,
            record.target,
            record.message
        );
        for (name, value) in &record.fields {
            // writing into a String cannot fail
            let _ = match value {
                Value::String(s) => write!(line, " {name}={s}"),
                other => write!(line, " {name}={other}"),
            };
        }
        Ok(Bytes::from(line))
    }
}
