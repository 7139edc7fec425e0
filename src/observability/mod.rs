//! Observability subsystem for emberdb
//!
//! Structured JSON logging only. The worker and the controller-side
//! correlator emit one log line per noteworthy event.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. No async or background threads
//! 4. Logging failure must never crash the worker

mod logger;

pub use logger::{Logger, Severity};
