//! Pass/fail accumulation for one session.

use crate::error::{CheckError, CheckResult};
use crate::feedback::Feedback;
use crate::session::ReportMode;
use tracing::debug;

/// One evaluated test with the feedback to show if it failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Test {
    passed: bool,
    feedback: Feedback,
}

impl Test {
    /// A test that has already failed.
    pub fn fail(feedback: Feedback) -> Self {
        Self {
            passed: false,
            feedback,
        }
    }

    /// Passes when `expected == actual`.
    pub fn equal<T: PartialEq + ?Sized>(expected: &T, actual: &T, feedback: Feedback) -> Self {
        Self {
            passed: expected == actual,
            feedback,
        }
    }

    /// Passes when `comparator(expected, actual)` holds.
    pub fn equal_by<T: ?Sized>(
        expected: &T,
        actual: &T,
        feedback: Feedback,
        comparator: impl Fn(&T, &T) -> bool,
    ) -> Self {
        Self {
            passed: comparator(expected, actual),
            feedback,
        }
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn feedback(&self) -> &Feedback {
        &self.feedback
    }
}

/// Records every test outcome of a session in order.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    mode: ReportMode,
    passed: usize,
    failures: Vec<Feedback>,
}

impl Reporter {
    pub fn new(mode: ReportMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Record `test`. A failure halts the chain in fail-fast mode and is
    /// only recorded in collect mode.
    pub fn do_test(&mut self, test: Test) -> CheckResult<()> {
        if test.passed {
            self.passed += 1;
            return Ok(());
        }
        debug!(message = %test.feedback.message, "test failed");
        self.failures.push(test.feedback.clone());
        match self.mode {
            ReportMode::FailFast => Err(CheckError::Halt(test.feedback)),
            ReportMode::Collect => Ok(()),
        }
    }

    /// Record a failure that always ends the chain, whatever the mode.
    pub fn fail(&mut self, feedback: Feedback) -> CheckError {
        debug!(message = %feedback.message, "check halted");
        self.failures.push(feedback.clone());
        CheckError::Halt(feedback)
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    /// Every failure so far, in the order the checks ran.
    pub fn failures(&self) -> &[Feedback] {
        &self.failures
    }

    pub fn mode(&self) -> ReportMode {
        self.mode
    }
}
