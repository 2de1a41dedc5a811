//! The execution-service contract.
//!
//! An [`ExecutionEnvironment`] is a long-lived, isolated runtime. The
//! checker owns one for the solution and one for the student and drives
//! both synchronously; every call returns only when the outcome is known.

use crate::ast::{Expr, Module, WithItem};
use crate::value::Value;
use std::fmt;
use thiserror::Error;

/// An error raised by code running inside an environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct RaisedError {
    /// Exception class name, e.g. `ValueError`.
    pub kind: String,
    pub message: String,
}

impl RaisedError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Why entering a managed-resource context failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContextError {
    /// The context expression did not evaluate to a context manager.
    #[error("object of type '{0}' is not a context manager")]
    NotAContextManager(String),
    /// The `as` target does not match the number of yielded values.
    #[error("cannot bind context values: {0}")]
    TargetMismatch(String),
    /// Evaluating the context expression raised.
    #[error(transparent)]
    Raised(#[from] RaisedError),
}

/// Outcome of running code: the value, everything printed, and the error
/// if one was raised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub value: Option<Value>,
    pub stdout: String,
    pub error: Option<RaisedError>,
}

impl Evaluation {
    pub fn raised(&self) -> bool {
        self.error.is_some()
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, &self.value) {
            (Some(error), _) => write!(f, "raised {error}"),
            (None, Some(value)) => write!(f, "returned {value}"),
            (None, None) => write!(f, "returned nothing"),
        }
    }
}

/// A process-isolated runtime the checker evaluates code in.
pub trait ExecutionEnvironment {
    /// Execute a whole program, keeping its top-level bindings.
    fn run(&mut self, module: &Module) -> Evaluation;

    /// Evaluate one expression, capturing its value, output and error.
    fn evaluate(&mut self, expr: &Expr) -> Evaluation;

    /// Enter every item's context, binding their `as` targets until the
    /// matching [`exit_context`](Self::exit_context). Returns the bound
    /// names. On failure nothing stays entered.
    fn enter_context(&mut self, items: &[WithItem]) -> Result<Vec<String>, ContextError>;

    /// Exit the most recently entered batch of contexts.
    fn exit_context(&mut self) -> Result<(), RaisedError>;
}
