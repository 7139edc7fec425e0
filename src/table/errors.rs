//! Error types for the table store

use thiserror::Error;

use crate::eval::EvalError;

/// Result type for table store operations
pub type TableResult<T> = Result<T, TableError>;

/// Table store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// Named table does not exist in the registry
    #[error("Table {0} does not exist.")]
    NotFound(String),

    /// Table name is already taken
    #[error("Table {0} already exists.")]
    AlreadyExists(String),

    /// Record does not carry the table's item-type tag
    #[error("Record does not match the item type [{expected}] of the table.")]
    TypeMismatch { expected: String },

    /// A record lacks the requested sort property
    #[error("The property {property} does not exist on all records.")]
    MissingSortField { property: String },

    /// A logic fragment faulted while scanning; the operation is aborted
    #[error(transparent)]
    Eval(#[from] EvalError),
}
