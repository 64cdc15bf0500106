//! Code execution results and the repeated-failure escalation policy.

mod streak;

pub use streak::{ErrorStreak, StreakOutcome, TEST_FAILURE_SIGNATURE};

use serde::{Deserialize, Serialize};

/// Outcome of one sandbox run.
///
/// A failing test suite or a runtime exception in candidate code is a normal
/// result, not an error of the system; only infrastructure failures surface
/// as `ProctorError`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    /// Sandbox status description (e.g. "Accepted", "Runtime Error (NZEC)").
    #[serde(default)]
    pub status: String,
    pub test_passed: bool,
    pub test_total: u32,
    /// Wall time in seconds.
    pub time: Option<f64>,
    /// Peak memory in kilobytes.
    pub memory: Option<u64>,
}

impl ExecutionResult {
    /// `stderr` if it carries any text.
    pub fn stderr_text(&self) -> Option<&str> {
        self.stderr.as_deref().filter(|s| !s.is_empty())
    }

    /// Whether this run counts as a code failure.
    pub fn is_failure(&self) -> bool {
        !self.test_passed || self.stderr_text().is_some()
    }

    /// Identity of the failure used to detect repeated identical errors.
    ///
    /// `stderr` when non-empty, otherwise a fixed literal for a plain test
    /// failure.
    pub fn error_signature(&self) -> String {
        self.stderr_text()
            .map(str::to_string)
            .unwrap_or_else(|| TEST_FAILURE_SIGNATURE.to_string())
    }
}
