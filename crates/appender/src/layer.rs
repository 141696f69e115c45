//! `tracing` integration
//!
//! [`RedisLayer`] turns every `tracing` event into a [`LogRecord`] and
//! appends it. Events whose target belongs to this workspace (`redlog*`)
//! are skipped so the pipeline never logs into itself.
//!
//! ```ignore
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(RedisLayer::new(appender.clone()))
//!     .init();
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber, debug};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::appender::RedisAppender;
use crate::record::LogRecord;

const MESSAGE_FIELD: &str = "message";

/// Forwards `tracing` events to a [`RedisAppender`]
#[derive(Debug, Clone)]
pub struct RedisLayer {
    appender: Arc<RedisAppender>,
}

impl RedisLayer {
    /// Create a layer feeding `appender`
    pub fn new(appender: Arc<RedisAppender>) -> Self {
        Self { appender }
    }

    /// The appender fed by this layer
    pub fn appender(&self) -> &Arc<RedisAppender> {
        &self.appender
    }
}

/// Whether `target` belongs to one of this workspace's crates
pub fn is_internal_target(target: &str) -> bool {
    target == "redlog" || target.starts_with("redlog_") || target.starts_with("redlog::")
}

impl<S: Subscriber> Layer<S> for RedisLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_internal_target(metadata.target()) || !self.appender.is_started() {
            return;
        }

        let mut record = LogRecord::new(*metadata.level(), metadata.target(), String::new());
        event.record(&mut RecordVisitor(&mut record));

        // a layer has nowhere to return the error
        if let Err(e) = self.appender.append(&record) {
            debug!(appender = self.appender.name(), error = %e, "append failed");
        }
    }
}

struct RecordVisitor<'a>(&'a mut LogRecord);

impl RecordVisitor<'_> {
    fn put(&mut self, field: &Field, value: Value) {
        if field.name() == MESSAGE_FIELD {
            self.0.message = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
        } else {
            self.0.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for RecordVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, Value::String(format!("{value:?}")));
    }
}

#[cfg(test)]
#[path = "layer_test.rs"]
mod layer_test;
