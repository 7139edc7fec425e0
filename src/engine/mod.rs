//! Worker engine for emberdb
//!
//! The worker owns the table registry and the evaluation environment and
//! executes one request envelope at a time, start to finish. Every failure
//! it can attribute to a request id becomes an error result; nothing on the
//! dispatch path panics the worker.
//!
//! # Request lifecycle
//!
//! 1. Parse the envelope (salvage the request id from malformed input when
//!    possible; drop and log otherwise)
//! 2. Install the closure context, all-or-nothing
//! 3. Dispatch by kind: table management goes straight to the registry,
//!    query kinds compile their logic fragments first
//! 4. Build the result, send it, tear the closure down unconditionally

mod errors;
mod worker;

pub use errors::{EngineError, EngineResult};
pub use worker::{Worker, WorkerConfig};
