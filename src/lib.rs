//! emberdb - An embedded, worker-isolated, in-memory record store
//!
//! A controller issues table-management and record-query operations over an
//! ordered message channel; an isolated worker owns all table state and
//! answers each request with exactly one result envelope, correlated by
//! request id.

pub mod client;
pub mod engine;
pub mod eval;
pub mod observability;
pub mod protocol;
pub mod table;
