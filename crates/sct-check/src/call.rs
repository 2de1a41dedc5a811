//! Call equivalence: run the same call against the solution's and the
//! student's function and compare what happens.

use crate::error::{AuthoringError, BuildError, CheckError, CheckResult};
use crate::reporter::Test;
use crate::session::Session;
use crate::state::{LineageEntry, State};
use crate::template::Bindings;
use sct_types::ast::{Expr, ExprKind, Node};
use sct_types::process::Evaluation;
use sct_types::value::Value;
use serde_json::Value as Json;
use tracing::debug;

const MSG_CALL_INCORRECT: &str = "Calling {{argstr}} should {{action}} `{{str_sol}}`, instead of {{str_stu if str_stu == 'no printouts' else '`' + str_stu + '`'}}.";
const MSG_CALL_ERROR: &str =
    "Calling {{argstr}} should {{action}} `{{str_sol}}`, instead it errored out: `{{str_stu}}`.";
const MSG_CALL_ERROR_INV: &str =
    "Calling {{argstr}} should {{action}} `{{str_sol}}`, instead of `{{str_stu}}`.";
const MSG_RERAN: &str = "To verify it, we reran {{argstr}}.";
const NO_PRINTOUTS: &str = "no printouts";

/// What to compare after calling both functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    /// The returned value.
    Value,
    /// Everything printed during the call.
    Output,
    /// The error the call raises.
    Error,
}

impl CallMode {
    fn action(self) -> &'static str {
        match self {
            CallMode::Value => "return",
            CallMode::Output => "print out",
            CallMode::Error => "error out with the message",
        }
    }

    fn check_name(self) -> &'static str {
        match self {
            CallMode::Value => "has_equal_value",
            CallMode::Output => "has_equal_output",
            CallMode::Error => "has_equal_error",
        }
    }
}

/// Custom equality for returned values.
pub type Comparator<'a> = &'a dyn Fn(&Value, &Value) -> bool;

/// Overrides for a call comparison. Everything defaults.
#[derive(Clone, Copy, Default)]
pub struct CallOptions<'a> {
    pub incorrect_msg: Option<&'a str>,
    /// Shown when the student raised and the solution did not, or the
    /// other way round.
    pub error_msg: Option<&'a str>,
    /// How the call is referred to in messages.
    pub argstr: Option<&'a str>,
    pub comparator: Option<Comparator<'a>>,
}

impl<'a> CallOptions<'a> {
    pub fn incorrect_msg(mut self, template: &'a str) -> Self {
        self.incorrect_msg = Some(template);
        self
    }

    pub fn error_msg(mut self, template: &'a str) -> Self {
        self.error_msg = Some(template);
        self
    }

    pub fn argstr(mut self, argstr: &'a str) -> Self {
        self.argstr = Some(argstr);
        self
    }

    pub fn comparator(mut self, comparator: Comparator<'a>) -> Self {
        self.comparator = Some(comparator);
        self
    }
}

/// Turn `callstr` (e.g. `f(1, b=2)`) into a call of the function defined
/// by `node`, plus the way the call is described in messages.
///
/// A function definition is called by name; a lambda is called inline.
pub fn build_call(callstr: &str, node: &Node) -> Result<(Expr, String), BuildError> {
    let func = match node {
        Node::Stmt(_) => match node.as_function_def() {
            Some(def) => Expr::new(ExprKind::Name(def.name.name.clone()), def.name.span),
            None => return Err(BuildError::NotCallable(node.kind_name())),
        },
        Node::Expr(expr) if node.as_lambda().is_some() => expr.clone(),
        _ => return Err(BuildError::NotCallable(node.kind_name())),
    };

    let parsed = sct_parser::parse_expression(callstr).map_err(|errors| BuildError::Parse {
        template: callstr.to_string(),
        reason: errors.to_string(),
    })?;
    let span = parsed.span;
    let ExprKind::Call(mut call) = parsed.kind else {
        return Err(BuildError::NotACall(callstr.to_string()));
    };
    call.func = Box::new(func);

    let argstr = match node.as_lambda() {
        Some(_) => format!("it with the arguments `({})`", call.arguments()),
        None => format!("`{call}`"),
    };
    Ok((Expr::new(ExprKind::Call(call), span), argstr))
}

/// Captured output with one trailing newline removed.
fn normalize_output(stdout: &str) -> String {
    let trimmed = stdout.strip_suffix('\n').unwrap_or(stdout);
    if trimmed.is_empty() {
        NO_PRINTOUTS.to_string()
    } else {
        trimmed.to_string()
    }
}

/// The string form of an outcome under `mode`.
fn describe(mode: CallMode, evaluation: &Evaluation) -> CheckResult<String> {
    if let Some(error) = &evaluation.error {
        return Ok(error.message.clone());
    }
    match mode {
        CallMode::Output => Ok(normalize_output(&evaluation.stdout)),
        CallMode::Value | CallMode::Error => match &evaluation.value {
            Some(value) => Ok(value.to_string()),
            None => Err(CheckError::Environment(
                "evaluation returned neither a value nor an error".to_string(),
            )),
        },
    }
}

impl State {
    /// Call the function this state is positioned at, in both
    /// environments, and compare the outcomes under `mode`.
    pub fn call(
        &self,
        session: &mut Session,
        callstr: &str,
        mode: CallMode,
        options: CallOptions<'_>,
    ) -> CheckResult<()> {
        let (solution_call, solution_argstr) = build_call(callstr, &self.solution)?;
        let student_call = self.build_student_call(session, callstr)?;
        let argstr = options.argstr.map(str::to_string).unwrap_or(solution_argstr);
        self.compare_calls(
            session,
            mode,
            &options,
            &solution_call,
            &student_call,
            &argstr,
            &self.student,
        )
    }

    /// Position a child state at the call `callstr` of this state's
    /// function, for use with `has_equal_value`, `has_equal_output` or
    /// `has_equal_error`.
    pub fn check_call(
        &self,
        session: &mut Session,
        callstr: &str,
        argstr: Option<&str>,
        expand_msg: Option<&str>,
    ) -> CheckResult<State> {
        if self.solution.as_function_def().is_none() && self.solution.as_lambda().is_none() {
            return Err(AuthoringError::WrongState {
                check: "check_call",
                expected: "check_function_def or check_lambda_function",
            }
            .into());
        }
        let (solution_call, solution_argstr) = build_call(callstr, &self.solution)?;
        let student_call = self.build_student_call(session, callstr)?;
        let argstr = argstr.map(str::to_string).unwrap_or(solution_argstr);

        let bindings = Bindings::from([("argstr".to_string(), Json::String(argstr.clone()))]);
        let entry = LineageEntry::new(expand_msg.unwrap_or(MSG_RERAN), bindings);
        let mut child = self.synthesized_child(
            Node::Expr(student_call),
            Node::Expr(solution_call),
            self.student.clone(),
            entry,
        );
        child.argstr = Some(argstr);
        Ok(child)
    }

    /// Compare the values the prepared call returns.
    pub fn has_equal_value(&self, session: &mut Session, options: CallOptions<'_>) -> CheckResult<()> {
        self.has_equal(session, CallMode::Value, options)
    }

    /// Compare what the prepared call prints.
    pub fn has_equal_output(&self, session: &mut Session, options: CallOptions<'_>) -> CheckResult<()> {
        self.has_equal(session, CallMode::Output, options)
    }

    /// Compare the errors the prepared call raises.
    pub fn has_equal_error(&self, session: &mut Session, options: CallOptions<'_>) -> CheckResult<()> {
        self.has_equal(session, CallMode::Error, options)
    }

    fn has_equal(
        &self,
        session: &mut Session,
        mode: CallMode,
        options: CallOptions<'_>,
    ) -> CheckResult<()> {
        let prepared = match (&self.argstr, &self.solution, &self.student) {
            (Some(argstr), Node::Expr(solution), Node::Expr(student))
                if matches!(solution.kind, ExprKind::Call(_))
                    && matches!(student.kind, ExprKind::Call(_)) =>
            {
                Some((argstr, solution, student))
            }
            _ => None,
        };
        let (argstr, solution, student) =
            self.require_position(mode.check_name(), "check_call", prepared)?;
        let argstr = options.argstr.unwrap_or(argstr);
        self.compare_calls(session, mode, &options, solution, student, argstr, self.highlight())
    }

    /// The student side of a call. A student node that is not a function
    /// is the student's mistake.
    fn build_student_call(&self, session: &mut Session, callstr: &str) -> CheckResult<Expr> {
        match build_call(callstr, &self.student) {
            Ok((call, _)) => Ok(call),
            Err(BuildError::NotCallable(kind)) => {
                debug!(kind, "student node is not callable");
                let message = self.build_message(
                    "Expected a function definition or a lambda function here.",
                    &Bindings::new(),
                )?;
                Err(session.fail(self.feedback(message)))
            }
            Err(err) => Err(err.into()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn compare_calls(
        &self,
        session: &mut Session,
        mode: CallMode,
        options: &CallOptions<'_>,
        solution_call: &Expr,
        student_call: &Expr,
        argstr: &str,
        student_function: &Node,
    ) -> CheckResult<()> {
        let expects_error = mode == CallMode::Error;

        let solution = session.solution_env().evaluate(solution_call);
        debug!(call = %solution_call, outcome = %solution, "solution call");
        if expects_error != solution.raised() {
            let detail = match &solution.error {
                Some(error) => error.to_string(),
                None => solution.to_string(),
            };
            return Err(AuthoringError::SolutionCall(format!(
                "Calling {argstr} resulted in an error (or not an error if testing for one). \
                 Error message: {detail}"
            ))
            .into());
        }
        let str_sol = describe(mode, &solution)?;

        let student = session.student_env().evaluate(student_call);
        debug!(call = %student_call, outcome = %student, "student call");
        let str_stu = describe(mode, &student)?;

        let bindings = Bindings::from([
            ("part".to_string(), Json::String(argstr.to_string())),
            ("argstr".to_string(), Json::String(argstr.to_string())),
            ("str_sol".to_string(), Json::String(str_sol.clone())),
            ("str_stu".to_string(), Json::String(str_stu.clone())),
            ("action".to_string(), Json::String(mode.action().to_string())),
        ]);

        if expects_error != student.raised() {
            let default = if expects_error {
                MSG_CALL_ERROR_INV
            } else {
                MSG_CALL_ERROR
            };
            let message = self.build_message(options.error_msg.unwrap_or(default), &bindings)?;
            let feedback = self.feedback_at(message, student_function);
            return session.do_test(Test::fail(feedback));
        }

        let message = self.build_message(
            options.incorrect_msg.unwrap_or(MSG_CALL_INCORRECT),
            &bindings,
        )?;
        let feedback = self.feedback_at(message, student_function);
        let test = match (mode, &solution.value, &student.value) {
            (CallMode::Value, Some(expected), Some(actual)) => match options.comparator {
                Some(comparator) => Test::equal_by(expected, actual, feedback, comparator),
                None => Test::equal(expected, actual, feedback),
            },
            _ => Test::equal(str_sol.as_str(), str_stu.as_str(), feedback),
        };
        session.do_test(test)
    }
}
