//! Runtime error types for the interpreter.

use sct_types::process::RaisedError;
use sct_types::value::Value;
use thiserror::Error;

/// Evaluation error: an exception raised by the program, or an internal
/// control signal.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// An exception raised by running code.
    #[error(transparent)]
    Raised(#[from] RaisedError),
    /// `return` unwinding to the enclosing call.
    #[error("'return' outside function")]
    Return(Value),
    /// Step budget exhausted.
    #[error("step limit exceeded")]
    StepLimitExceeded,
}

impl EvalError {
    /// Shorthand for raising `kind(message)`.
    pub fn raise(kind: &str, message: impl Into<String>) -> Self {
        Self::Raised(RaisedError::new(kind, message))
    }

    /// The exception this error surfaces as outside the interpreter.
    pub fn into_raised(self) -> RaisedError {
        match self {
            Self::Raised(error) => error,
            Self::Return(_) => RaisedError::new("SyntaxError", "'return' outside function"),
            Self::StepLimitExceeded => {
                RaisedError::new("RecursionError", "maximum recursion depth exceeded")
            }
        }
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
