//! Integration tests for session-level behavior.
//!
//! Covers:
//! - fail-fast and collect reporting modes
//! - independent chains within one session
//! - summaries and their serialized form
//! - disabled highlighting
//! - determinism across repeated sessions

use pretty_assertions::assert_eq;
use sct_check::{
    CallMode, CallOptions, ChainOutcome, Messages, ReportMode, Session, SessionConfig,
};
use sct_eval::Interpreter;
use sct_parser::parse_module;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn session(solution: &str, student: &str, config: SessionConfig) -> Session {
    let solution = parse_module("solution.py", solution).expect("solution parses");
    let student = parse_module("student.py", student).expect("student parses");
    let solution_env = Interpreter::from_module(&solution).expect("solution runs");
    let student_env = Interpreter::from_module(&student).expect("student runs");
    Session::new(
        solution,
        student,
        Box::new(solution_env),
        Box::new(student_env),
        config,
    )
}

const SQUARE: &str = "def f(x):\n    return x * x\n";
const DOUBLE: &str = "def f(x):\n    return x + x\n";

/// Call `f` with each argument in turn, in one chain.
fn call_each(session: &mut Session, args: &[i64]) -> sct_check::CheckResult<ChainOutcome> {
    session.check(|s| {
        let def = s
            .root_state()
            .check_function_def(s, "f", &Messages::default().expand(""))?;
        for arg in args {
            def.call(s, &format!("f({arg})"), CallMode::Value, CallOptions::default())?;
        }
        Ok(())
    })
}

fn messages(outcome: &ChainOutcome) -> Vec<&str> {
    match outcome {
        ChainOutcome::Passed => Vec::new(),
        ChainOutcome::Failed(feedback) => feedback.iter().map(|f| f.message.as_str()).collect(),
        ChainOutcome::Halted(feedback) => vec![feedback.message.as_str()],
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Reporting modes
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_fail_fast_stops_at_first_failure() {
    let mut session = session(SQUARE, DOUBLE, SessionConfig::default());
    let outcome = call_each(&mut session, &[2, 3, 1]).expect("no authoring errors");
    assert_eq!(
        messages(&outcome),
        vec!["Calling `f(3)` should return `9`, instead of `6`."]
    );
    let summary = session.summary();
    assert_eq!((summary.passed, summary.failed), (1, 1));
}

#[test]
fn test_collect_mode_records_every_failure() {
    let config = SessionConfig {
        mode: ReportMode::Collect,
        ..SessionConfig::default()
    };
    let mut session = session(SQUARE, DOUBLE, config);
    let outcome = call_each(&mut session, &[3, 2, 1]).expect("no authoring errors");
    assert!(matches!(outcome, ChainOutcome::Failed(_)));
    assert_eq!(
        messages(&outcome),
        vec![
            "Calling `f(3)` should return `9`, instead of `6`.",
            "Calling `f(1)` should return `1`, instead of `2`.",
        ]
    );
    let summary = session.summary();
    assert_eq!((summary.passed, summary.failed), (1, 2));
}

#[test]
fn test_collect_mode_still_halts_on_missing_part() {
    let config = SessionConfig::from_json(r#"{"mode": "collect"}"#).expect("valid config");
    let mut session = session(SQUARE, "x = 1\n", config);
    let outcome = call_each(&mut session, &[3]).expect("no authoring errors");
    assert_eq!(messages(&outcome), vec!["Did you define `f()`?"]);
    assert!(matches!(outcome, ChainOutcome::Halted(_)));
}

#[test]
fn test_chains_are_independent() {
    let mut session = session(SQUARE, DOUBLE, SessionConfig::default());
    let first = call_each(&mut session, &[3]).expect("no authoring errors");
    let second = call_each(&mut session, &[2]).expect("no authoring errors");
    assert!(matches!(first, ChainOutcome::Halted(_)));
    assert_eq!(second, ChainOutcome::Passed);
    assert!(second.passed());
}

// ══════════════════════════════════════════════════════════════════════════════
// Summary
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_summary_serializes_diagnostics() {
    let mut session = session(SQUARE, DOUBLE, SessionConfig::default());
    call_each(&mut session, &[3]).expect("no authoring errors");
    let json = serde_json::to_value(session.summary()).expect("serializes");
    assert_eq!(json["passed"], 0);
    assert_eq!(json["failed"], 1);
    let diagnostic = &json["diagnostics"][0];
    assert_eq!(
        diagnostic["message"],
        "Calling `f(3)` should return `9`, instead of `6`."
    );
    assert_eq!(diagnostic["highlight"]["kind"], "function_def");
    assert_eq!(diagnostic["highlight"]["line"], 1);
}

#[test]
fn test_summary_display() {
    let config = SessionConfig {
        highlighting_disabled: true,
        ..SessionConfig::default()
    };
    let mut session = session(SQUARE, DOUBLE, config);
    call_each(&mut session, &[2]).expect("no authoring errors");
    call_each(&mut session, &[3]).expect("no authoring errors");
    assert_eq!(
        session.summary().to_string(),
        "FAIL Calling `f(3)` should return `9`, instead of `6`.\n1 passed, 1 failed\n"
    );
}

#[test]
fn test_highlighting_disabled() {
    let config = SessionConfig::from_json(r#"{"highlighting_disabled": true}"#)
        .expect("valid config");
    let mut session = session(SQUARE, DOUBLE, config);
    match call_each(&mut session, &[3]) {
        Ok(ChainOutcome::Halted(feedback)) => assert_eq!(feedback.highlight, None),
        other => panic!("expected a halted chain, got {other:?}"),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Determinism
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_repeated_sessions_agree() {
    let run = || {
        let mut session = session(SQUARE, DOUBLE, SessionConfig::default());
        let outcome = call_each(&mut session, &[2, 3]);
        (outcome, session.summary())
    };
    let first = run();
    for _ in 0..5 {
        assert_eq!(run(), first);
    }
}
