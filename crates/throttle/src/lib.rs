//! Redlog - Throttle
//!
//! Bounded, rate-limited, batching pipeline between log producers and a
//! [`Sink`](redlog_sinks::Sink).
//!
//! # Architecture
//!
//! ```text
//! producers ──push()──► admission ──offer──► EventBuffer ──► FlushLoop ──► Sink
//!   (any thread)         │ not started                         │ batch_size
//!                        │ last sink failure                   │ flush_period
//!                        │ events/s, bytes/s                   │
//!                        ▼                                     ▼
//!                  ThrottlerStats ◄───────────── success / failure counts
//!                                    LastError ◄── sink errors
//! ```
//!
//! `push` never blocks and never performs I/O: a full buffer is a drop,
//! not back-pressure. The flush loop is the only task that waits.
//!
//! # Shutdown
//!
//! - [`Throttler::close`]: flush everything buffered once, then stop
//! - [`Throttler::abort`]: stop now, buffered events are dropped

mod buffer;
mod error;
mod flush;
mod last_error;
mod rate_limiter;
mod report;
mod state;
mod throttler;

pub use buffer::{EventBuffer, EventReceiver, Polled, event_buffer};
pub use error::{RateLimitError, Result, ThrottleError};
pub use last_error::LastError;
pub use rate_limiter::RateLimiter;
pub use report::ErrorReporter;
pub use state::State;
pub use throttler::Throttler;
