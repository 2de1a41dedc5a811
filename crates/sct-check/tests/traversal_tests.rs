//! Integration tests for part extraction and node indexing.
//!
//! Covers:
//! - missing student parts become diagnostics, never authoring errors
//! - parts absent from the solution are authoring errors
//! - ordinals and lineage in rendered messages
//! - argument addressing on definitions, lambdas and calls
//! - node sequences by name

use pretty_assertions::assert_eq;
use sct_check::{
    Arg, AuthoringError, ChainOutcome, CheckError, CheckResult, Messages, NodeSequence, PartIndex,
    Session, SessionConfig,
};
use sct_eval::Interpreter;
use sct_parser::parse_module;
use sct_types::parts::PartKey;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn session(solution: &str, student: &str) -> Session {
    let solution = parse_module("solution.py", solution).expect("solution parses");
    let student = parse_module("student.py", student).expect("student parses");
    let solution_env = Interpreter::from_module(&solution).expect("solution runs");
    let student_env = Interpreter::from_module(&student).expect("student runs");
    Session::new(
        solution,
        student,
        Box::new(solution_env),
        Box::new(student_env),
        SessionConfig::default(),
    )
}

/// The message of a halted chain.
fn halted(outcome: CheckResult<ChainOutcome>) -> String {
    match outcome {
        Ok(ChainOutcome::Halted(feedback)) => feedback.message,
        other => panic!("expected a halted chain, got {other:?}"),
    }
}

fn defaults() -> Messages {
    Messages::default()
}

// ══════════════════════════════════════════════════════════════════════════════
// Missing student parts
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_missing_function_definition() {
    let mut session = session("def f(x):\n    return x\n", "x = 1\n");
    let message = halted(session.check(|s| {
        s.root_state().check_function_def(s, "f", &defaults()).map(|_| ())
    }));
    assert_eq!(message, "Did you define `f()`?");
}

#[test]
fn test_missing_argument_is_a_diagnostic() {
    let mut session = session(
        "def f(x, y):\n    return x + y\n",
        "def f(x):\n    return x\n",
    );
    let outcome = session.check(|s| {
        s.root_state()
            .check_function_def(s, "f", &defaults())?
            .check_args(s, 1usize, None)
            .map(|_| ())
    });
    match outcome {
        Ok(ChainOutcome::Halted(feedback)) => {
            assert_eq!(
                feedback.message,
                "Check the definition of `f()`. Did you specify the second argument?"
            );
            let highlight = feedback.highlight.expect("highlighted");
            assert_eq!(highlight.kind, "function_def");
            assert_eq!(highlight.span.start_line, 1);
        }
        other => panic!("expected a halted chain, got {other:?}"),
    }
}

#[test]
fn test_missing_named_argument_uses_custom_message() {
    let mut session = session(
        "def f(x, flag=True):\n    return x\n",
        "def f(x):\n    return x\n",
    );
    let message = halted(session.check(|s| {
        s.root_state()
            .check_function_def(s, "f", &defaults())?
            .check_args(s, "flag", Some("Where is the {{part}}?"))
            .map(|_| ())
    }));
    assert_eq!(
        message,
        "Check the definition of `f()`. Where is the argument `flag`?"
    );
}

#[test]
fn test_missing_statement_in_body() {
    let mut session = session(
        "def f(x):\n    y = x * 2\n    return y\n",
        "def f(x):\n    return x * 2\n",
    );
    let message = halted(session.check(|s| {
        s.root_state()
            .check_function_def(s, "f", &defaults())?
            .check_body(s)?
            .check_node(s, NodeSequence::Statements, 1usize, "{{ordinal}} statement", &defaults())
            .map(|_| ())
    }));
    assert_eq!(
        message,
        "Check the definition of `f()`. Did you correctly specify the body? \
         The system wants to check the second statement but hasn't found it."
    );
}

#[test]
fn test_ordinals_in_lambda_messages() {
    let solution = "a = lambda x: x\nb = lambda x: x\nc = lambda x: x\n";
    let mut session = session(solution, "a = lambda x: x\n");
    let first = session.check(|s| {
        s.root_state()
            .check_lambda_function(s, 0, &defaults())
            .map(|_| ())
    });
    assert_eq!(first, Ok(ChainOutcome::Passed));
    let message = halted(session.check(|s| {
        s.root_state()
            .check_lambda_function(s, 2, &defaults())
            .map(|_| ())
    }));
    assert_eq!(message, "Did you define the third lambda function?");
}

#[test]
fn test_missing_call_argument() {
    let mut session = session("print(1, 2)\n", "print(1)\n");
    let message = halted(session.check(|s| {
        let index = PartIndex::from(vec![PartKey::from("print"), PartKey::from(0usize)]);
        s.root_state()
            .check_node(
                s,
                NodeSequence::FunctionCalls,
                index,
                "first call of `print()`",
                &defaults(),
            )?
            .check_args(s, 1usize, None)
            .map(|_| ())
    }));
    assert_eq!(
        message,
        "Check the first call of `print()`. Did you specify the second argument?"
    );
}

/// Zoom into the first `print()` call and its `sep` keyword.
fn check_print_sep(session: &mut Session) -> CheckResult<ChainOutcome> {
    session.check(|s| {
        let index = PartIndex::from(vec![PartKey::from("print"), PartKey::from(0usize)]);
        let sep = s
            .root_state()
            .check_node(
                s,
                NodeSequence::FunctionCalls,
                index,
                "first call of `print()`",
                &defaults(),
            )?
            .check_args(s, Arg::Path(vec!["kwargs".into(), "sep".into()]), None)?;
        assert_eq!(sep.solution.to_string(), "\"-\"");
        Ok(())
    })
}

#[test]
fn test_keyword_argument_by_path() {
    let mut session = session("print(1, sep='-')\n", "print(1, sep='-')\n");
    assert_eq!(check_print_sep(&mut session), Ok(ChainOutcome::Passed));

    let mut session = self::session("print(1, sep='-')\n", "print(1)\n");
    assert_eq!(
        halted(check_print_sep(&mut session)),
        "Check the first call of `print()`. Did you specify the argument `sep`?"
    );
}

#[test]
fn test_custom_expand_message() {
    let mut session = session(
        "def f(x, y=1):\n    return x\n",
        "def f(x, y):\n    return x\n",
    );
    let message = halted(session.check(|s| {
        s.root_state()
            .check_function_def(s, "f", &defaults().expand("Look at `f`."))?
            .check_args(s, "y", None)?
            .check_part(s, "default", Some("default value"), &defaults())
            .map(|_| ())
    }));
    assert_eq!(
        message,
        "Look at `f`. Did you correctly specify the argument `y`? \
         Are you sure you defined the default value?"
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Authoring errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_part_absent_from_solution_is_authoring_error() {
    let students = [
        "def f(x):\n    return x\n",
        "def f(x):\n    if x:\n        return 1\n    else:\n        return 2\n",
        "def f():\n    pass\n",
    ];
    for student in students {
        let mut session = session("def f(x):\n    return x\n", student);
        let outcome = session.check(|s| {
            s.root_state()
                .check_function_def(s, "f", &defaults())?
                .check_part(s, "orelse", None, &defaults())
                .map(|_| ())
        });
        assert!(
            matches!(
                outcome,
                Err(CheckError::Authoring(AuthoringError::MissingSolutionPart(_)))
            ),
            "{student}: {outcome:?}"
        );
    }
}

#[test]
fn test_function_absent_from_solution_is_authoring_error() {
    let mut session = session("def f(x):\n    return x\n", "def g(x):\n    return x\n");
    let outcome = session.check(|s| {
        s.root_state()
            .check_function_def(s, "g", &defaults())
            .map(|_| ())
    });
    assert!(matches!(
        outcome,
        Err(CheckError::Authoring(AuthoringError::MissingSolutionPart(_)))
    ));
    assert!(session.reporter().failures().is_empty());
}

#[test]
fn test_index_beyond_solution_is_authoring_error() {
    let mut session = session("a = lambda x: x\n", "a = lambda x: x\nb = lambda y: y\n");
    let outcome = session.check(|s| {
        s.root_state()
            .check_lambda_function(s, 1, &defaults())
            .map(|_| ())
    });
    assert!(matches!(
        outcome,
        Err(CheckError::Authoring(AuthoringError::MissingSolutionPart(_)))
    ));
}

#[test]
fn test_undefined_template_binding_is_authoring_error() {
    let mut session = session("def f(x):\n    return x\n", "x = 1\n");
    let outcome = session.check(|s| {
        s.root_state()
            .check_function_def(s, "f", &defaults().missing("No {{thing}}."))
            .map(|_| ())
    });
    assert!(matches!(
        outcome,
        Err(CheckError::Authoring(AuthoringError::Template(_)))
    ));
}

#[test]
fn test_unknown_sequence_name() {
    assert_eq!(
        "loops".parse::<NodeSequence>(),
        Err(AuthoringError::UnknownSequence("loops".into()))
    );
    assert_eq!(
        "function_calls".parse::<NodeSequence>(),
        Ok(NodeSequence::FunctionCalls)
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Child states
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_body_binds_parameters() {
    let mut session = session(
        "def f(a, *rest):\n    return a\n",
        "def f(b, *others):\n    return b\n",
    );
    let outcome = session.check(|s| {
        let body = s
            .root_state()
            .check_function_def(s, "f", &defaults())?
            .check_body(s)?;
        assert_eq!(body.student_context, vec!["b".to_string(), "others".into()]);
        assert_eq!(body.solution_context, vec!["a".to_string(), "rest".into()]);
        Ok(())
    });
    assert_eq!(outcome, Ok(ChainOutcome::Passed));
}

#[test]
fn test_argument_state_highlights_parameter() {
    let mut session = session(
        "def f(x, y=2):\n    return x\n",
        "def f(x, y=3):\n    return x\n",
    );
    let outcome = session.check(|s| {
        let arg = s
            .root_state()
            .check_function_def(s, "f", &defaults())?
            .check_args(s, "y", None)?;
        assert_eq!(arg.highlight().kind_name(), "param");
        assert_eq!(arg.highlight().to_string(), "y=3");
        let default = arg.check_part(s, "default", None, &defaults())?;
        assert_eq!(default.student.to_string(), "3");
        assert_eq!(default.solution.to_string(), "2");
        Ok(())
    });
    assert_eq!(outcome, Ok(ChainOutcome::Passed));
}

#[test]
fn test_varargs_parameter() {
    let mut session = session(
        "def f(*values):\n    return values\n",
        "def f(values):\n    return values\n",
    );
    let message = halted(session.check(|s| {
        s.root_state()
            .check_function_def(s, "f", &defaults())?
            .check_args(s, "*args", None)
            .map(|_| ())
    }));
    assert_eq!(
        message,
        "Check the definition of `f()`. Did you specify the argument `*args`?"
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Idempotence
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_same_extraction_renders_same_diagnostic() {
    let solution = "def f(x, y):\n    return x\n";
    let student = "def f(x):\n    return x\n";
    let run = || {
        let mut session = session(solution, student);
        session.check(|s| {
            let root = s.root_state();
            let first = root.check_function_def(s, "f", &defaults())?;
            let second = root.check_function_def(s, "f", &defaults())?;
            assert_eq!(first, second);
            second.check_args(s, 1usize, None).map(|_| ())
        })
    };
    let outcomes: Vec<_> = (0..3).map(|_| run()).collect();
    assert!(matches!(outcomes[0], Ok(ChainOutcome::Halted(_))));
    assert_eq!(outcomes[0], outcomes[1]);
    assert_eq!(outcomes[1], outcomes[2]);
}
