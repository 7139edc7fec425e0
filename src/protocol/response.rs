//! Result envelope types
//!
//! One result envelope flows worker → controller per accepted request,
//! carrying either an error payload or operation-specific data.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::errors::ErrorPayload;

/// Wire kind string for result envelopes
pub const RESULT_OP: &str = "result";

/// Result envelope tagged with the originating request id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// Always [`RESULT_OP`]
    pub op: String,
    #[serde(rename = "requestId")]
    pub request_id: Uuid,
    /// Null on success
    pub error: Option<ErrorPayload>,
    /// Operation-specific: status string, count, record, null marker, or
    /// array of records
    pub data: Value,
}

impl ResultEnvelope {
    /// Build a success result
    pub fn success(request_id: Uuid, data: Value) -> Self {
        Self {
            op: RESULT_OP.to_string(),
            request_id,
            error: None,
            data,
        }
    }

    /// Build an error result
    pub fn failure(request_id: Uuid, error: ErrorPayload) -> Self {
        Self {
            op: RESULT_OP.to_string(),
            request_id,
            error: Some(error),
            data: Value::Null,
        }
    }

    /// Parse a result envelope from a JSON string
    ///
    /// Returns `None` for anything that is not a well-formed result envelope;
    /// the correlator discards such messages.
    pub fn parse(json: &str) -> Option<Self> {
        let envelope: Self = serde_json::from_str(json).ok()?;
        if envelope.op != RESULT_OP {
            return None;
        }
        Some(envelope)
    }

    /// Serialize to the JSON wire shape
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("ResultEnvelope serialization cannot fail")
    }

    /// Check whether this result carries data rather than an error
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::errors::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_success_round_trip() {
        let id = Uuid::new_v4();
        let envelope = ResultEnvelope::success(id, json!([{"name": "a"}]));
        let parsed = ResultEnvelope::parse(&envelope.to_json()).unwrap();

        assert!(parsed.is_success());
        assert_eq!(parsed.request_id, id);
        assert_eq!(parsed.data, json!([{"name": "a"}]));
    }

    #[test]
    fn test_failure_round_trip() {
        let id = Uuid::new_v4();
        let envelope =
            ResultEnvelope::failure(id, ErrorPayload::new(ErrorCode::TableNotFound, "no table"));
        let parsed = ResultEnvelope::parse(&envelope.to_json()).unwrap();

        assert!(!parsed.is_success());
        let error = parsed.error.unwrap();
        assert_eq!(error.code, "EMBER_TABLE_NOT_FOUND");
        assert_eq!(parsed.data, Value::Null);
    }

    #[test]
    fn test_rejects_non_result_messages() {
        assert!(ResultEnvelope::parse("garbage").is_none());

        let request_like = json!({
            "op": "getRecords",
            "requestId": Uuid::new_v4(),
            "error": null,
            "data": null,
        });
        assert!(ResultEnvelope::parse(&request_like.to_string()).is_none());
    }
}
