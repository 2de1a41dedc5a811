//! Shared types for the SCT checking engine.
//!
//! This crate defines the program-tree AST, the parts mappings used to
//! address sub-structures of a node, runtime values, source spans, parse
//! errors, and the execution-service contract that the checker drives.

mod error;
mod span;
pub mod ast;
pub mod parts;
pub mod process;
pub mod value;

pub use error::{ErrorCategory, ErrorCode, ParseError, ParseErrors, MAX_ERRORS};
pub use span::{SourceFile, Span};

/// Result type used by the parsing stages.
pub type Result<T> = std::result::Result<T, ParseError>;
