//! The check session: both programs, both environments, the reporter.

use crate::error::{CheckError, CheckResult};
use crate::feedback::Feedback;
use crate::reporter::{Reporter, Test};
use crate::state::State;
use sct_types::ast::{Module, Node};
use sct_types::process::ExecutionEnvironment;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// How failing tests affect the running chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// The first failing test halts the chain.
    #[default]
    FailFast,
    /// Failing tests are recorded and the chain continues. Structural
    /// failures still halt.
    Collect,
}

/// Session settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub mode: ReportMode,
    /// When set, feedback carries no highlight.
    pub highlighting_disabled: bool,
}

impl SessionConfig {
    /// Parse settings from JSON; absent fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// What one chain of checks ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    Passed,
    /// The chain completed but recorded these failures (collect mode).
    Failed(Vec<Feedback>),
    /// The chain stopped at this failure.
    Halted(Feedback),
}

impl ChainOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, ChainOutcome::Passed)
    }
}

/// Totals over every chain run in a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub passed: usize,
    pub failed: usize,
    pub diagnostics: Vec<Feedback>,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "FAIL {diagnostic}")?;
        }
        writeln!(f, "{} passed, {} failed", self.passed, self.failed)
    }
}

/// One checking session over a solution/student program pair.
///
/// The session owns both execution environments for its whole lifetime
/// and is handed by `&mut` to every check, which is how diagnostics reach
/// the reporter.
pub struct Session {
    solution_tree: Module,
    student_tree: Module,
    solution_env: Box<dyn ExecutionEnvironment>,
    student_env: Box<dyn ExecutionEnvironment>,
    reporter: Reporter,
    config: SessionConfig,
}

impl Session {
    /// Both environments are expected to have run their program already.
    pub fn new(
        solution_tree: Module,
        student_tree: Module,
        solution_env: Box<dyn ExecutionEnvironment>,
        student_env: Box<dyn ExecutionEnvironment>,
        config: SessionConfig,
    ) -> Self {
        Self {
            solution_tree,
            student_tree,
            solution_env,
            student_env,
            reporter: Reporter::new(config.mode),
            config,
        }
    }

    /// The state positioned at both whole programs.
    pub fn root_state(&self) -> State {
        State::root(
            Node::Module(self.student_tree.clone()),
            Node::Module(self.solution_tree.clone()),
            self.config.highlighting_disabled,
        )
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn solution_env(&mut self) -> &mut dyn ExecutionEnvironment {
        self.solution_env.as_mut()
    }

    pub fn student_env(&mut self) -> &mut dyn ExecutionEnvironment {
        self.student_env.as_mut()
    }

    /// Diagnostic sink: record a test outcome.
    pub fn do_test(&mut self, test: Test) -> CheckResult<()> {
        self.reporter.do_test(test)
    }

    /// Record a failure that ends the chain.
    pub fn fail(&mut self, feedback: Feedback) -> CheckError {
        self.reporter.fail(feedback)
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Run one chain of checks.
    ///
    /// A halt ends only this chain and comes back as an outcome; authoring
    /// and environment errors are returned as errors.
    pub fn check<F>(&mut self, chain: F) -> CheckResult<ChainOutcome>
    where
        F: FnOnce(&mut Session) -> CheckResult<()>,
    {
        let before = self.reporter.failures().len();
        let outcome = match chain(self) {
            Ok(()) => {
                let recorded = &self.reporter.failures()[before..];
                if recorded.is_empty() {
                    ChainOutcome::Passed
                } else {
                    ChainOutcome::Failed(recorded.to_vec())
                }
            }
            Err(CheckError::Halt(feedback)) => ChainOutcome::Halted(feedback),
            Err(err) => return Err(err),
        };
        debug!(?outcome, "chain finished");
        Ok(outcome)
    }

    pub fn summary(&self) -> SessionSummary {
        let diagnostics = self.reporter.failures().to_vec();
        SessionSummary {
            passed: self.reporter.passed(),
            failed: diagnostics.len(),
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SessionConfig::from_json("{}").expect("valid json");
        assert_eq!(config.mode, ReportMode::FailFast);
        assert!(!config.highlighting_disabled);
    }

    #[test]
    fn test_config_from_json() {
        let config =
            SessionConfig::from_json(r#"{"mode": "collect", "highlighting_disabled": true}"#)
                .expect("valid json");
        assert_eq!(
            config,
            SessionConfig {
                mode: ReportMode::Collect,
                highlighting_disabled: true,
            }
        );
    }

    #[test]
    fn test_config_rejects_unknown_mode() {
        assert!(SessionConfig::from_json(r#"{"mode": "sometimes"}"#).is_err());
    }

    #[test]
    fn test_summary_display() {
        let summary = SessionSummary {
            passed: 2,
            failed: 1,
            diagnostics: vec![Feedback::message("Did you define the body?")],
        };
        assert_eq!(
            summary.to_string(),
            "FAIL Did you define the body?\n2 passed, 1 failed\n"
        );
    }
}
