//! Redlog - Sinks
//!
//! Destinations that accept batches of pre-formatted events.
//!
//! # Architecture
//!
//! A throttler's flush loop owns an `Arc<dyn Sink>` and calls
//! `push_batch` once per batch. Sinks never buffer or retry on their own:
//! a failed batch is reported to the caller and the next call starts
//! fresh (reconnecting if needed).
//!
//! ```text
//! [Throttler] --flush loop--> Sink::push_batch(&[Event]) --> [Destination]
//! ```
//!
//! # Available Sinks
//!
//! | Sink | Purpose |
//! |------|---------|
//! | `redis` | `RPUSH` every batch onto a Redis list |
//! | `null` | Discard batches, count them (benchmarks and dry runs) |

mod common;

/// Null sink - discards all batches
pub mod null;

/// Redis sink - RESP `RPUSH` over TCP
pub mod redis;

pub use common::{Event, Sink, SinkError, SinkMetricsHandle};
