//! Observability
//!
//! Structured, synchronous logging for engine events. One log line =
//! one event; deterministic key ordering; no buffering.

mod logger;

pub use logger::{Logger, Severity};
