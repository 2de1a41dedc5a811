//! SCT checking engine.
//!
//! Walks a solution program and a student program in lockstep, runs
//! equivalent calls in two execution environments and reports the first
//! divergence as localized feedback.
//!
//! ```text
//! Session ─ root_state() → State ─ check_part / check_node → State ─ ...
//!                                 ─ call / check_call → has_equal_*
//!                                 ─ with_context(checks)
//! ```
//!
//! Every step returns a [`CheckResult`]. A student-facing failure is
//! [`CheckError::Halt`]; [`Session::check`] turns it into a recorded
//! outcome, while authoring and environment errors propagate to the caller.

pub mod call;
pub mod check_node;
pub mod check_part;
pub mod context;
pub mod error;
pub mod feedback;
pub mod ordinal;
pub mod reporter;
pub mod session;
pub mod state;
pub mod template;

pub use call::{build_call, CallMode, CallOptions, Comparator};
pub use check_node::NodeSequence;
pub use check_part::{Arg, Messages, PartIndex};
pub use context::SubCheck;
pub use error::{AuthoringError, BuildError, CheckError, CheckResult};
pub use feedback::{Feedback, Highlight};
pub use ordinal::get_ord;
pub use reporter::{Reporter, Test};
pub use session::{ChainOutcome, ReportMode, Session, SessionConfig, SessionSummary};
pub use state::{LineageEntry, State};
pub use template::{render, Bindings, TemplateError};
