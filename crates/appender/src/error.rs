//! Appender error types

use redlog_throttle::ThrottleError;
use thiserror::Error;

use crate::appender::AppenderState;

/// Result type for appender operations
pub type Result<T> = std::result::Result<T, AppenderError>;

/// Errors from appender lifecycle and delivery
#[derive(Debug, Error)]
pub enum AppenderError {
    /// A lifecycle call made from the wrong state
    #[error("appender '{appender}': expecting state {expected}, found {found}")]
    InvalidState {
        /// Appender name
        appender: String,
        /// State the call requires
        expected: AppenderState,
        /// State the appender was in
        found: AppenderState,
    },

    /// The record could not be encoded by the layout
    #[error("failed to encode log record: {0}")]
    Encode(#[from] serde_json::Error),

    /// The throttler refused the event or could not start
    #[error(transparent)]
    Throttle(#[from] ThrottleError),
}
