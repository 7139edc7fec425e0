//! Request correlator
//!
//! Maps outstanding request ids to completion handlers and resolves each at
//! most once when the matching result envelope arrives. Results for unknown
//! or already-resolved ids are discarded without error; a panicking handler
//! is isolated and logged so later results keep resolving.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

use serde_json::Value;
use uuid::Uuid;

use crate::observability::Logger;
use crate::protocol::{ErrorPayload, ResultEnvelope};

/// Completion handler invoked with (error, data)
pub type ResultHandler = Box<dyn FnOnce(Option<ErrorPayload>, Value) + Send + 'static>;

/// Pending-request table for one connection
#[derive(Default)]
pub struct Correlator {
    pending: Mutex<HashMap<Uuid, ResultHandler>>,
}

impl Correlator {
    /// Create an empty correlator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a handler under a fresh request id.
    ///
    /// Ids are UUID v4, so each outstanding request has exactly one entry.
    pub fn register(&self, request_id: Uuid, handler: ResultHandler) {
        let mut pending = self.pending.lock().expect("correlator lock poisoned");
        pending.insert(request_id, handler);
    }

    /// Forget a registered handler (e.g. when the send itself failed)
    pub fn discard(&self, request_id: Uuid) -> Option<ResultHandler> {
        let mut pending = self.pending.lock().expect("correlator lock poisoned");
        pending.remove(&request_id)
    }

    /// Resolve a result envelope against the pending table.
    ///
    /// The entry is removed before the handler runs, so a second result with
    /// the same id is a no-op.
    pub fn resolve(&self, envelope: ResultEnvelope) {
        let handler = {
            let mut pending = self.pending.lock().expect("correlator lock poisoned");
            pending.remove(&envelope.request_id)
        };

        let handler = match handler {
            Some(handler) => handler,
            None => return, // unknown or already resolved
        };

        let ResultEnvelope { request_id, error, data, .. } = envelope;
        let invocation = catch_unwind(AssertUnwindSafe(move || handler(error, data)));
        if invocation.is_err() {
            let id = request_id.to_string();
            Logger::error("HANDLER_PANICKED", &[("requestId", id.as_str())]);
        }
    }

    /// Parse a raw channel message and resolve it.
    ///
    /// Anything that is not a well-formed result envelope is discarded.
    pub fn process_raw(&self, raw: &str) {
        match ResultEnvelope::parse(raw) {
            Some(envelope) => self.resolve(envelope),
            None => Logger::warn("RESULT_DISCARDED", &[("reason", "not a result envelope")]),
        }
    }

    /// Number of unresolved requests
    pub fn pending_len(&self) -> usize {
        self.pending.lock().expect("correlator lock poisoned").len()
    }
}
