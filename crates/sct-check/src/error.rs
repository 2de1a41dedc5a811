//! Error categories of a check session.

use crate::feedback::Feedback;
use crate::template::TemplateError;
use thiserror::Error;

/// Why a check chain stopped.
///
/// Only [`CheckError::Halt`] is the student's fault; the other two
/// categories must reach whoever runs the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
    /// A student-facing failure that ends the current chain.
    #[error("check failed: {0}")]
    Halt(Feedback),
    /// The solution or the check itself is inconsistent.
    #[error("authoring error: {0}")]
    Authoring(#[from] AuthoringError),
    /// An execution environment broke its contract.
    #[error("environment error: {0}")]
    Environment(String),
}

impl CheckError {
    pub fn is_halt(&self) -> bool {
        matches!(self, CheckError::Halt(_))
    }
}

/// A defect in the solution program or in the check that was written
/// against it. Never attributed to the student.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthoringError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Build(#[from] BuildError),
    /// The solution has no such part (or no such index within it).
    #[error("the solution has no {0}")]
    MissingSolutionPart(String),
    /// The solution part does not stand for a single tree node.
    #[error("the solution's {0} is not a program node")]
    MalformedSolutionPart(String),
    #[error("unknown node sequence '{0}'")]
    UnknownSequence(String),
    /// The solution raised where it should not have, or did not raise
    /// where it should.
    #[error("{0}")]
    SolutionCall(String),
    #[error("error in the solution, running with_context(): {0}")]
    SolutionContext(String),
    #[error("error in the solution, closing the `with` fails with: {0}")]
    SolutionContextExit(String),
    /// The state is not positioned where the check needs it to be.
    #[error("{check}() can only follow {expected}")]
    WrongState {
        check: &'static str,
        expected: &'static str,
    },
}

/// Failure to synthesize a call expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("can only call a function definition or a lambda, not a {0}")]
    NotCallable(&'static str),
    #[error("call template `{0}` is not a call expression")]
    NotACall(String),
    #[error("call template `{template}` does not parse: {reason}")]
    Parse { template: String, reason: String },
}

impl From<TemplateError> for CheckError {
    fn from(err: TemplateError) -> Self {
        CheckError::Authoring(err.into())
    }
}

impl From<BuildError> for CheckError {
    fn from(err: BuildError) -> Self {
        CheckError::Authoring(err.into())
    }
}

/// Result alias for check operations.
pub type CheckResult<T> = Result<T, CheckError>;
