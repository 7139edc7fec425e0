//! Controller side of the protocol
//!
//! The correlator resolves result envelopes against pending completion
//! handlers, exactly once per request id; the connection wires a spawned
//! worker's channels to one correlator and pumps results in the background.
//!
//! # Invariants
//!
//! - `submit` never blocks waiting for a reply
//! - Every handler runs at most once; duplicate or unknown result ids are
//!   dropped silently
//! - A panicking handler is isolated and logged; later results still resolve

mod connection;
mod correlator;
mod errors;

pub use connection::Connection;
pub use correlator::{Correlator, ResultHandler};
pub use errors::{ClientError, ClientResult};
