//! Common types for sinks
//!
//! The `Sink` trait, its error type and the shared metrics handle.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use redlog_metrics::{SinkMetrics, SinkMetricsSnapshot};
use thiserror::Error;

/// A single pre-formatted log record
///
/// Cheap to clone; the payload is never inspected by the pipeline.
pub type Event = Bytes;

/// Destination for batches of events
///
/// Must stay usable after a failed call.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Sink name for logging
    fn name(&self) -> &str;

    /// Deliver one ordered batch
    ///
    /// # Errors
    ///
    /// Returns `SinkError` if the destination did not accept the batch.
    async fn push_batch(&self, events: &[Event]) -> Result<(), SinkError>;

    /// Release any connection held by the sink
    async fn close(&self) {}
}

/// Sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Could not reach the destination
    #[error("connection to {target} failed: {source}")]
    Connection {
        /// Destination address
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// An operation exceeded its deadline
    #[error("{operation} timed out")]
    Timeout {
        /// What was being waited for
        operation: &'static str,
    },

    /// I/O error on an established connection
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection
    #[error("connection closed by peer")]
    Closed,

    /// The destination answered with an error
    #[error("rejected by server: {0}")]
    Rejected(String),

    /// The destination answered with something unexpected
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Generic write failure
    #[error("write failed: {0}")]
    Write(String),
}

impl SinkError {
    /// Create a timeout error
    pub fn timeout(operation: &'static str) -> Self {
        Self::Timeout { operation }
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a write error
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    /// Whether the connection that produced this error is unusable
    pub fn is_connection_error(&self) -> bool {
        !matches!(self, Self::Rejected(_) | Self::Write(_))
    }
}

/// Handle for reading a sink's delivery metrics
///
/// Holds an Arc to the metrics, so it remains valid after the sink has
/// been handed to a throttler.
#[derive(Debug, Clone)]
pub struct SinkMetricsHandle {
    name: String,
    metrics: Arc<SinkMetrics>,
}

impl SinkMetricsHandle {
    pub(crate) fn new(name: impl Into<String>, metrics: Arc<SinkMetrics>) -> Self {
        Self {
            name: name.into(),
            metrics,
        }
    }

    /// Sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current counters
    pub fn snapshot(&self) -> SinkMetricsSnapshot {
        self.metrics.snapshot()
    }
}
