//! Redlog - Appender
//!
//! Log appender that ships encoded records to a Redis list.
//!
//! # Overview
//!
//! ```text
//! tracing event ──► RedisLayer ──► LogRecord ──► Layout ──► bytes
//!                                                             │
//!                        RedisAppender::append ◄──────────────┘
//!                                 │
//!                                 ▼
//!                  Throttler ──batches──► RedisSink (RPUSH key ...)
//! ```
//!
//! - [`RedisAppender`]: lifecycle plus the throttler and sink it owns
//! - [`Layout`]: `json` or `plain` encoding of a [`LogRecord`]
//! - [`RedisLayer`]: `tracing_subscriber::Layer` feeding an appender

mod appender;
mod error;
mod layer;
mod layout;
mod record;

#[cfg(test)]
mod testing;

pub use appender::{AppenderState, RedisAppender};
pub use error::{AppenderError, Result};
pub use layer::{RedisLayer, is_internal_target};
pub use layout::{JsonLayout, Layout, PlainLayout, layout_for};
pub use record::LogRecord;
