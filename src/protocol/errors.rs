//! Wire error codes and payloads
//!
//! Every failure the worker detects while processing a request is carried
//! back to the controller as an explicit tagged structure (code + message).
//! Error objects never cross the channel as language-native exceptions.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable wire error codes
///
/// Format: EMBER_CATEGORY_NAME
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Named table does not exist
    TableNotFound,
    /// Table already exists on create
    TableExists,
    /// Record does not match the table's item-type tag
    TypeMismatch,
    /// A record lacks the requested sort property
    MissingSortField,
    /// Closure name collides with an existing binding
    ClosureConflict,
    /// Closure payload is not usable (not an object, or too wide)
    InvalidClosure,
    /// Logic fragment failed to compile
    CompileError,
    /// Logic fragment failed at evaluation time
    EvalError,
    /// Request kind is not recognized
    UnknownOperation,
    /// Malformed or incomplete request envelope
    InvalidRequest,
    /// Catch-all for unexpected faults
    Generic,
}

impl ErrorCode {
    /// Returns the string code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::TableNotFound => "EMBER_TABLE_NOT_FOUND",
            ErrorCode::TableExists => "EMBER_TABLE_EXISTS",
            ErrorCode::TypeMismatch => "EMBER_TYPE_MISMATCH",
            ErrorCode::MissingSortField => "EMBER_MISSING_SORT_FIELD",
            ErrorCode::ClosureConflict => "EMBER_CLOSURE_CONFLICT",
            ErrorCode::InvalidClosure => "EMBER_INVALID_CLOSURE",
            ErrorCode::CompileError => "EMBER_COMPILE_ERROR",
            ErrorCode::EvalError => "EMBER_EVAL_ERROR",
            ErrorCode::UnknownOperation => "EMBER_UNKNOWN_OPERATION",
            ErrorCode::InvalidRequest => "EMBER_INVALID_REQUEST",
            ErrorCode::Generic => "EMBER_GENERIC",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error payload carried inside a result envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl ErrorPayload {
    /// Create a payload from a code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_str().to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Envelope-level parse and dispatch failures
///
/// `InvalidRequest` keeps whatever request id could be salvaged from the
/// malformed envelope; without one the failure cannot be attributed and the
/// worker can only log and drop it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProtocolError {
    /// Malformed envelope or missing required field
    #[error("invalid request: {message}")]
    InvalidRequest {
        request_id: Option<Uuid>,
        message: String,
    },

    /// Recognized envelope carrying an unrecognized operation kind
    #[error("unknown operation: {op}")]
    UnknownOperation { request_id: Uuid, op: String },
}

impl ProtocolError {
    /// Request id this failure can be attributed to, when recoverable
    pub fn request_id(&self) -> Option<Uuid> {
        match self {
            ProtocolError::InvalidRequest { request_id, .. } => *request_id,
            ProtocolError::UnknownOperation { request_id, .. } => Some(*request_id),
        }
    }

    /// Wire payload for this failure
    pub fn payload(&self) -> ErrorPayload {
        match self {
            ProtocolError::InvalidRequest { message, .. } => {
                ErrorPayload::new(ErrorCode::InvalidRequest, message.clone())
            }
            ProtocolError::UnknownOperation { op, .. } => ErrorPayload::new(
                ErrorCode::UnknownOperation,
                format!("Unknown operation: {}", op),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_stable() {
        assert_eq!(ErrorCode::TableNotFound.as_str(), "EMBER_TABLE_NOT_FOUND");
        assert_eq!(ErrorCode::ClosureConflict.as_str(), "EMBER_CLOSURE_CONFLICT");
        assert_eq!(ErrorCode::Generic.as_str(), "EMBER_GENERIC");
    }

    #[test]
    fn test_payload_round_trip() {
        let payload = ErrorPayload::new(ErrorCode::TypeMismatch, "bad record");
        let json = serde_json::to_string(&payload).unwrap();
        let back: ErrorPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
        assert_eq!(back.code, "EMBER_TYPE_MISMATCH");
    }

    #[test]
    fn test_unknown_operation_attributable() {
        let id = Uuid::new_v4();
        let err = ProtocolError::UnknownOperation {
            request_id: id,
            op: "dropEverything".to_string(),
        };
        assert_eq!(err.request_id(), Some(id));
        assert!(err.payload().message.contains("dropEverything"));
    }
}
