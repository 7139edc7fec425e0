//! Worker engine errors
//!
//! One enum wraps every failure the dispatch path can produce; a single
//! mapping turns it into the wire payload so error codes stay consistent
//! across subsystems.

use thiserror::Error;

use crate::eval::EvalError;
use crate::protocol::{ErrorCode, ErrorPayload};
use crate::table::TableError;

/// Result type for dispatch operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Any failure while executing a parsed request
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Table store failure
    #[error(transparent)]
    Table(#[from] TableError),

    /// Logic fragment failure outside a table scan (compile, closure)
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// Catch-all for unexpected faults
    #[error("{0}")]
    Generic(String),
}

impl EngineError {
    /// Wire error code for this failure
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Table(TableError::NotFound(_)) => ErrorCode::TableNotFound,
            EngineError::Table(TableError::AlreadyExists(_)) => ErrorCode::TableExists,
            EngineError::Table(TableError::TypeMismatch { .. }) => ErrorCode::TypeMismatch,
            EngineError::Table(TableError::MissingSortField { .. }) => ErrorCode::MissingSortField,
            EngineError::Table(TableError::Eval(eval)) => eval_code(eval),
            EngineError::Eval(eval) => eval_code(eval),
            EngineError::Generic(_) => ErrorCode::Generic,
        }
    }

    /// Wire payload for this failure
    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload::new(self.code(), self.to_string())
    }
}

fn eval_code(error: &EvalError) -> ErrorCode {
    match error {
        EvalError::Compile { .. } => ErrorCode::CompileError,
        EvalError::Evaluation { .. } => ErrorCode::EvalError,
        EvalError::ClosureConflict { .. } => ErrorCode::ClosureConflict,
        EvalError::InvalidClosure { .. } => ErrorCode::InvalidClosure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_error_codes() {
        let err = EngineError::from(TableError::NotFound("users".to_string()));
        assert_eq!(err.code(), ErrorCode::TableNotFound);
        assert!(err.payload().message.contains("users"));

        let err = EngineError::from(TableError::AlreadyExists("users".to_string()));
        assert_eq!(err.code(), ErrorCode::TableExists);
    }

    #[test]
    fn test_eval_error_codes_pass_through_table_scans() {
        let eval = EvalError::evaluation("unknown name [x]");
        let err = EngineError::from(TableError::Eval(eval.clone()));
        assert_eq!(err.code(), ErrorCode::EvalError);

        let err = EngineError::from(eval);
        assert_eq!(err.code(), ErrorCode::EvalError);
    }

    #[test]
    fn test_compile_and_closure_codes() {
        let err = EngineError::from(EvalError::compile(0, "bad"));
        assert_eq!(err.code(), ErrorCode::CompileError);

        let err = EngineError::from(EvalError::ClosureConflict {
            name: "len".to_string(),
        });
        assert_eq!(err.code(), ErrorCode::ClosureConflict);
    }
}
