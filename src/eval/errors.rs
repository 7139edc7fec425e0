//! Error types for the expression engine

use thiserror::Error;

/// Result type for expression engine operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Expression engine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Logic fragment failed to lex or parse
    #[error("compile error at offset {position}: {message}")]
    Compile { position: usize, message: String },

    /// Logic fragment faulted while running against a record
    #[error("evaluation error: {message}")]
    Evaluation { message: String },

    /// Closure payload name collides with an existing binding
    #[error("name [{name}] is already bound in the current scope")]
    ClosureConflict { name: String },

    /// Closure payload cannot be installed at all
    #[error("invalid closure: {message}")]
    InvalidClosure { message: String },
}

impl EvalError {
    /// Create a compile error
    pub fn compile(position: usize, message: impl Into<String>) -> Self {
        EvalError::Compile {
            position,
            message: message.into(),
        }
    }

    /// Create an evaluation error
    pub fn evaluation(message: impl Into<String>) -> Self {
        EvalError::Evaluation {
            message: message.into(),
        }
    }
}
