//! Batches of checks, optionally run inside the contexts of a `with`
//! statement.

use crate::error::{AuthoringError, CheckResult};
use crate::session::Session;
use crate::state::State;
use crate::template::Bindings;
use sct_types::ast::{Node, WithItem};
use sct_types::parts::{Part, PartsMap};
use sct_types::process::ContextError;
use serde_json::Value as Json;
use tracing::{debug, warn};

const MSG_NOT_A_CONTEXT_MANAGER: &str =
    "In your `with` statement, you're not using a correct context manager.";
const MSG_TARGET_MISMATCH: &str = "In your `with` statement, the number of values in your context manager doesn't correspond to the number of variables you're trying to assign it to.";
const MSG_ENTER_RAISED: &str =
    "In your `with` statement, setting up the context manager failed: `{{error}}`.";
const MSG_EXIT_FAILED: &str = "Your `with` statement can not be closed off correctly, you're not using the context manager correctly.";

/// A check run against a state, e.g. inside [`State::multi`].
pub type SubCheck<'a> = &'a dyn Fn(&State, &mut Session) -> CheckResult<()>;

/// The items of a `with` statement's parts, if it has any.
fn with_items(parts: &PartsMap) -> Option<Vec<WithItem>> {
    match parts.get("with_items")? {
        Part::Ordered(items) => items
            .iter()
            .map(|part| match part {
                Part::Bare(Node::WithItem(item)) => Some(item.clone()),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

impl State {
    /// Run `checks` against this state in order. The first failure ends
    /// the batch.
    pub fn multi(&self, session: &mut Session, checks: &[SubCheck<'_>]) -> CheckResult<()> {
        checks.iter().try_for_each(|check| check(self, session))
    }

    /// Enter the contexts of this `with` statement in both environments,
    /// run `checks`, then exit both.
    ///
    /// Both environments are exited exactly once whatever the checks did.
    /// A failure closing the solution's context wins over everything else;
    /// a failure closing the student's context is reported only when the
    /// checks themselves passed.
    pub fn with_context(&self, session: &mut Session, checks: &[SubCheck<'_>]) -> CheckResult<()> {
        let solution_items = with_items(&self.solution_parts)
            .ok_or_else(|| AuthoringError::MissingSolutionPart("with_items".to_string()))?;
        if let Err(err) = session.solution_env().enter_context(&solution_items) {
            return Err(AuthoringError::SolutionContext(err.to_string()).into());
        }
        debug!(items = solution_items.len(), "entered solution context");

        let student_entered = match with_items(&self.student_parts) {
            Some(items) => session.student_env().enter_context(&items),
            None => Err(ContextError::NotAContextManager(
                self.student.kind_name().to_string(),
            )),
        };
        if let Err(err) = student_entered {
            debug!(%err, "student context failed to enter");
            let mut bindings = Bindings::new();
            let template = match &err {
                ContextError::NotAContextManager(_) => MSG_NOT_A_CONTEXT_MANAGER,
                ContextError::TargetMismatch(_) => MSG_TARGET_MISMATCH,
                ContextError::Raised(raised) => {
                    bindings.insert("error".to_string(), Json::String(raised.message.clone()));
                    MSG_ENTER_RAISED
                }
            };
            if let Err(exit) = session.solution_env().exit_context() {
                return Err(AuthoringError::SolutionContextExit(exit.to_string()).into());
            }
            let message = self.build_message(template, &bindings)?;
            return Err(session.fail(self.feedback(message)));
        }

        let outcome = self.multi(session, checks);

        let solution_exit = session.solution_env().exit_context();
        let student_exit = session.student_env().exit_context();
        debug!(
            solution_closed = solution_exit.is_ok(),
            student_closed = student_exit.is_ok(),
            "exited contexts"
        );

        if let Err(err) = solution_exit {
            if let Err(in_flight) = &outcome {
                warn!(%in_flight, "solution context failed to close during a failing check");
            }
            return Err(AuthoringError::SolutionContextExit(err.to_string()).into());
        }
        match (student_exit, outcome) {
            (Err(_), Ok(())) => {
                let message = self.build_message(MSG_EXIT_FAILED, &Bindings::new())?;
                Err(session.fail(self.feedback(message)))
            }
            (Err(err), Err(in_flight)) => {
                warn!(%err, "student context failed to close during a failing check");
                Err(in_flight)
            }
            (Ok(()), outcome) => outcome,
        }
    }
}
