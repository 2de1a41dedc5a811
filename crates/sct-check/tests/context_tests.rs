//! Integration tests for `with_context` and `multi`.
//!
//! Covers:
//! - contexts entered in both environments while sub-checks run
//! - teardown runs exactly once per environment, whatever the sub-checks did
//! - enter and exit failures on either side

use pretty_assertions::assert_eq;
use sct_check::{
    AuthoringError, ChainOutcome, CheckError, CheckResult, Messages, Session, SessionConfig,
    State, SubCheck,
};
use sct_eval::Interpreter;
use sct_parser::{parse_expression, parse_module};
use sct_types::ast::{Expr, Module, WithItem};
use sct_types::process::{ContextError, Evaluation, ExecutionEnvironment, RaisedError};
use sct_types::value::{ContextManager, Value};
use std::cell::Cell;
use std::rc::Rc;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// Shared enter/exit counters of a [`Counted`] environment.
#[derive(Clone, Default)]
struct Calls {
    enters: Rc<Cell<usize>>,
    exits: Rc<Cell<usize>>,
}

impl Calls {
    fn counts(&self) -> (usize, usize) {
        (self.enters.get(), self.exits.get())
    }
}

/// An interpreter that counts context entries and exits.
struct Counted {
    inner: Interpreter,
    calls: Calls,
}

impl ExecutionEnvironment for Counted {
    fn run(&mut self, module: &Module) -> Evaluation {
        self.inner.run(module)
    }

    fn evaluate(&mut self, expr: &Expr) -> Evaluation {
        self.inner.evaluate(expr)
    }

    fn enter_context(&mut self, items: &[WithItem]) -> Result<Vec<String>, ContextError> {
        self.calls.enters.set(self.calls.enters.get() + 1);
        self.inner.enter_context(items)
    }

    fn exit_context(&mut self) -> Result<(), RaisedError> {
        self.calls.exits.set(self.calls.exits.get() + 1);
        self.inner.exit_context()
    }
}

fn interpreter(source: &str) -> (Module, Interpreter) {
    let module = parse_module("test.py", source).expect("parses");
    let interp = Interpreter::from_module(&module).expect("runs");
    (module, interp)
}

/// A session over counted environments. `prepare` can add globals to the
/// student interpreter.
fn counted_session(
    solution: &str,
    student: &str,
    prepare: impl FnOnce(&mut Interpreter),
) -> (Session, Calls, Calls) {
    let (solution_tree, solution_env) = interpreter(solution);
    let (student_tree, mut student_env) = interpreter(student);
    prepare(&mut student_env);
    let solution_calls = Calls::default();
    let student_calls = Calls::default();
    let session = Session::new(
        solution_tree,
        student_tree,
        Box::new(Counted {
            inner: solution_env,
            calls: solution_calls.clone(),
        }),
        Box::new(Counted {
            inner: student_env,
            calls: student_calls.clone(),
        }),
        SessionConfig::default(),
    );
    (session, solution_calls, student_calls)
}

/// Run `checks` inside the first `with` statement.
fn in_first_with(session: &mut Session, checks: &[SubCheck<'_>]) -> CheckResult<ChainOutcome> {
    session.check(|s| {
        s.root_state()
            .check_with(s, 0, &Messages::default())?
            .with_context(s, checks)
    })
}

fn eval(env: &mut dyn ExecutionEnvironment, source: &str) -> Evaluation {
    env.evaluate(&parse_expression(source).expect("parses"))
}

const USE_RESOURCE: &str = "def use():\n    with resource(1) as r:\n        print(r)\n";

// ══════════════════════════════════════════════════════════════════════════════
// Teardown
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_bindings_visible_inside_context() {
    let (mut session, solution_calls, student_calls) =
        counted_session(USE_RESOURCE, USE_RESOURCE, |_| {});
    let sees_binding: SubCheck = &|_state: &State, s: &mut Session| {
        assert_eq!(eval(s.solution_env(), "r + 1").value, Some(Value::Int(2)));
        assert_eq!(eval(s.student_env(), "r + 1").value, Some(Value::Int(2)));
        Ok(())
    };
    let outcome = in_first_with(&mut session, &[sees_binding]);
    assert_eq!(outcome, Ok(ChainOutcome::Passed));
    assert_eq!(solution_calls.counts(), (1, 1));
    assert_eq!(student_calls.counts(), (1, 1));
    assert!(eval(session.student_env(), "r").raised());
}

#[test]
fn test_teardown_runs_once_when_sub_check_fails() {
    let (mut session, solution_calls, student_calls) =
        counted_session(USE_RESOURCE, USE_RESOURCE, |_| {});
    let ran_after = Cell::new(false);
    let failing: SubCheck = &|state: &State, s: &mut Session| {
        Err(s.fail(state.feedback("inner failure")))
    };
    let later: SubCheck = &|_state: &State, _s: &mut Session| {
        ran_after.set(true);
        Ok(())
    };
    let outcome = in_first_with(&mut session, &[failing, later]);
    match outcome {
        Ok(ChainOutcome::Halted(feedback)) => assert_eq!(feedback.message, "inner failure"),
        other => panic!("expected a halted chain, got {other:?}"),
    }
    assert!(!ran_after.get());
    assert_eq!(solution_calls.counts(), (1, 1));
    assert_eq!(student_calls.counts(), (1, 1));
}

#[test]
fn test_teardown_runs_once_on_authoring_error() {
    let (mut session, solution_calls, student_calls) =
        counted_session(USE_RESOURCE, USE_RESOURCE, |_| {});
    let authoring: SubCheck = &|state: &State, s: &mut Session| {
        state
            .check_part(s, "orelse", None, &Messages::default())
            .map(|_| ())
    };
    let outcome = in_first_with(&mut session, &[authoring]);
    assert!(matches!(
        outcome,
        Err(CheckError::Authoring(AuthoringError::MissingSolutionPart(_)))
    ));
    assert_eq!(solution_calls.counts(), (1, 1));
    assert_eq!(student_calls.counts(), (1, 1));
}

// ══════════════════════════════════════════════════════════════════════════════
// Enter failures
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_student_not_a_context_manager() {
    let student = "def use():\n    with 5 as r:\n        print(r)\n";
    let (mut session, solution_calls, student_calls) =
        counted_session(USE_RESOURCE, student, |_| {});
    let never: SubCheck = &|_state: &State, _s: &mut Session| panic!("sub-checks must not run");
    let outcome = in_first_with(&mut session, &[never]);
    match outcome {
        Ok(ChainOutcome::Halted(feedback)) => assert_eq!(
            feedback.message,
            "Check the first `with` statement. \
             In your `with` statement, you're not using a correct context manager."
        ),
        other => panic!("expected a halted chain, got {other:?}"),
    }
    assert_eq!(solution_calls.counts(), (1, 1));
    assert_eq!(student_calls.counts(), (1, 0));
}

#[test]
fn test_student_context_expression_raises() {
    let student = "def use():\n    with nothing_here(1) as r:\n        print(r)\n";
    let (mut session, solution_calls, student_calls) =
        counted_session(USE_RESOURCE, student, |_| {});
    let never: SubCheck = &|_state: &State, _s: &mut Session| panic!("sub-checks must not run");
    let outcome = in_first_with(&mut session, &[never]);
    match outcome {
        Ok(ChainOutcome::Halted(feedback)) => assert_eq!(
            feedback.message,
            "Check the first `with` statement. In your `with` statement, setting up the \
             context manager failed: `name 'nothing_here' is not defined`."
        ),
        other => panic!("expected a halted chain, got {other:?}"),
    }
    assert_eq!(solution_calls.counts(), (1, 1));
    assert_eq!(student_calls.counts(), (1, 0));
}

#[test]
fn test_student_target_mismatch() {
    let solution = "def use():\n    with resource((1, 2)) as (a, b):\n        print(a)\n";
    let student = "def use():\n    with resource((1, 2)) as (a, b, c):\n        print(a)\n";
    let (mut session, _, _) = counted_session(solution, student, |_| {});
    let outcome = in_first_with(&mut session, &[]);
    match outcome {
        Ok(ChainOutcome::Halted(feedback)) => assert!(feedback.message.ends_with(
            "the number of values in your context manager doesn't correspond \
             to the number of variables you're trying to assign it to."
        )),
        other => panic!("expected a halted chain, got {other:?}"),
    }
}

#[test]
fn test_solution_enter_failure_is_authoring_error() {
    let solution = "def use():\n    with 5 as r:\n        print(r)\n";
    let (mut session, _, student_calls) = counted_session(solution, USE_RESOURCE, |_| {});
    let outcome = in_first_with(&mut session, &[]);
    assert!(matches!(
        outcome,
        Err(CheckError::Authoring(AuthoringError::SolutionContext(_)))
    ));
    assert_eq!(student_calls.counts(), (0, 0));
}

// ══════════════════════════════════════════════════════════════════════════════
// Exit failures
// ══════════════════════════════════════════════════════════════════════════════

fn define_failing_conn(interp: &mut Interpreter) {
    let manager = ContextManager::new("conn", Value::Int(1))
        .failing_on_exit(RaisedError::new("IOError", "already closed"));
    interp.define("conn", Value::ContextManager(Rc::new(manager)));
}

const USE_CONN: &str = "def use():\n    with conn as r:\n        print(r)\n";

#[test]
fn test_student_exit_failure_is_diagnostic() {
    let (mut session, solution_calls, student_calls) =
        counted_session(USE_RESOURCE, USE_CONN, define_failing_conn);
    let outcome = in_first_with(&mut session, &[]);
    match outcome {
        Ok(ChainOutcome::Halted(feedback)) => assert_eq!(
            feedback.message,
            "Check the first `with` statement. Your `with` statement can not be closed off \
             correctly, you're not using the context manager correctly."
        ),
        other => panic!("expected a halted chain, got {other:?}"),
    }
    assert_eq!(solution_calls.counts(), (1, 1));
    assert_eq!(student_calls.counts(), (1, 1));
}

#[test]
fn test_in_flight_failure_wins_over_student_exit_failure() {
    let (mut session, _, student_calls) =
        counted_session(USE_RESOURCE, USE_CONN, define_failing_conn);
    let failing: SubCheck = &|state: &State, s: &mut Session| {
        Err(s.fail(state.feedback("inner failure")))
    };
    let outcome = in_first_with(&mut session, &[failing]);
    match outcome {
        Ok(ChainOutcome::Halted(feedback)) => assert_eq!(feedback.message, "inner failure"),
        other => panic!("expected a halted chain, got {other:?}"),
    }
    assert_eq!(student_calls.counts(), (1, 1));
    assert_eq!(session.reporter().failures().len(), 1);
}

#[test]
fn test_solution_exit_failure_is_authoring_error() {
    let (solution_tree, mut solution_env) = interpreter(USE_CONN);
    define_failing_conn(&mut solution_env);
    let (student_tree, student_env) = interpreter(USE_RESOURCE);
    let student_calls = Calls::default();
    let mut session = Session::new(
        solution_tree,
        student_tree,
        Box::new(solution_env),
        Box::new(Counted {
            inner: student_env,
            calls: student_calls.clone(),
        }),
        SessionConfig::default(),
    );
    let outcome = in_first_with(&mut session, &[]);
    assert!(matches!(
        outcome,
        Err(CheckError::Authoring(AuthoringError::SolutionContextExit(_)))
    ));
    assert_eq!(student_calls.counts(), (1, 1));
}

// ══════════════════════════════════════════════════════════════════════════════
// multi
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_multi_runs_checks_in_order() {
    let (mut session, _, _) = counted_session(
        "def f(x, y):\n    return x\n",
        "def f(x):\n    return x\n",
        |_| {},
    );
    let order = std::cell::RefCell::new(Vec::new());
    let first: SubCheck = &|state: &State, s: &mut Session| {
        order.borrow_mut().push("first");
        state.check_args(s, 0usize, None).map(|_| ())
    };
    let second: SubCheck = &|state: &State, s: &mut Session| {
        order.borrow_mut().push("second");
        state.check_args(s, 1usize, None).map(|_| ())
    };
    let third: SubCheck = &|_state: &State, _s: &mut Session| {
        order.borrow_mut().push("third");
        Ok(())
    };
    let outcome = session.check(|s| {
        s.root_state()
            .check_function_def(s, "f", &Messages::default())?
            .multi(s, &[first, second, third])
    });
    assert!(matches!(outcome, Ok(ChainOutcome::Halted(_))));
    assert_eq!(*order.borrow(), vec!["first", "second"]);
}
