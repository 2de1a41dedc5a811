//! SCT tree-walking interpreter.
//!
//! Executes programs directly from the AST and implements
//! [`ExecutionEnvironment`](sct_types::process::ExecutionEnvironment), so a
//! check session can run the solution and the student code side by side.

pub mod env;
pub mod error;
pub mod evaluator;

pub use env::Environment;
pub use error::{EvalError, EvalResult};
pub use evaluator::{Interpreter, BUILTINS, DEFAULT_STEP_LIMIT};
