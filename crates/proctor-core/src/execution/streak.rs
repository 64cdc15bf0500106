//! Consecutive identical failure tracking.

use super::ExecutionResult;
use serde::{Deserialize, Serialize};

/// Signature recorded when tests fail without any stderr output.
pub const TEST_FAILURE_SIGNATURE: &str = "Tests failed";

/// Failure streak state of a session.
///
/// Serialized flat into the session so the persisted document carries
/// `last_error_message`, `consecutive_errors` and `hint_given` directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorStreak {
    pub last_error_message: Option<String>,
    pub consecutive_errors: u32,
    pub hint_given: bool,
}

/// What the caller must do after folding a run into the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakOutcome {
    /// The run passed; the streak was cleared.
    Passed,
    /// The run failed; `consecutive` is the new streak length.
    Failed { consecutive: u32 },
    /// The run failed and crossed the threshold for the first time since the
    /// last pass. Exactly one hint must be emitted.
    Escalate { consecutive: u32 },
}

impl StreakOutcome {
    pub fn should_escalate(&self) -> bool {
        matches!(self, Self::Escalate { .. })
    }
}

impl ErrorStreak {
    /// Folds one execution result into the streak.
    ///
    /// - failure with the same signature as the previous failure: `+1`
    /// - failure with a different signature: reset to `1`
    /// - streak `>= threshold` and no hint yet: escalate and mark `hint_given`
    /// - pass: clear everything, including `hint_given`
    pub fn record(&mut self, result: &ExecutionResult, threshold: u32) -> StreakOutcome {
        if !result.is_failure() {
            self.consecutive_errors = 0;
            self.last_error_message = None;
            self.hint_given = false;
            return StreakOutcome::Passed;
        }

        let signature = result.error_signature();
        if self.last_error_message.as_deref() == Some(signature.as_str()) {
            self.consecutive_errors += 1;
        } else {
            self.consecutive_errors = 1;
            self.last_error_message = Some(signature);
        }

        let consecutive = self.consecutive_errors;
        if consecutive >= threshold && !self.hint_given {
            self.hint_given = true;
            StreakOutcome::Escalate { consecutive }
        } else {
            StreakOutcome::Failed { consecutive }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing(stderr: &str) -> ExecutionResult {
        ExecutionResult {
            stderr: Some(stderr.to_string()),
            test_passed: false,
            ..Default::default()
        }
    }

    fn passing() -> ExecutionResult {
        ExecutionResult {
            test_passed: true,
            test_total: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_identical_failures_increment_by_one() {
        let mut streak = ErrorStreak::default();
        for expected in 1..=6 {
            streak.record(&failing("TypeError: x"), 3);
            assert_eq!(streak.consecutive_errors, expected);
        }
    }

    #[test]
    fn test_third_identical_failure_escalates_once() {
        let mut streak = ErrorStreak::default();
        let outcomes: Vec<_> = (0..5)
            .map(|_| streak.record(&failing("TypeError: x"), 3))
            .collect();

        assert_eq!(outcomes[0], StreakOutcome::Failed { consecutive: 1 });
        assert_eq!(outcomes[1], StreakOutcome::Failed { consecutive: 2 });
        assert_eq!(outcomes[2], StreakOutcome::Escalate { consecutive: 3 });
        assert_eq!(outcomes[3], StreakOutcome::Failed { consecutive: 4 });
        assert_eq!(outcomes[4], StreakOutcome::Failed { consecutive: 5 });
        assert_eq!(
            outcomes.iter().filter(|o| o.should_escalate()).count(),
            1
        );
    }

    #[test]
    fn test_different_signature_resets_to_one() {
        let mut streak = ErrorStreak::default();
        streak.record(&failing("TypeError: x"), 3);
        streak.record(&failing("TypeError: x"), 3);
        let outcome = streak.record(&failing("ReferenceError: y"), 3);

        assert_eq!(outcome, StreakOutcome::Failed { consecutive: 1 });
        assert_eq!(streak.last_error_message.as_deref(), Some("ReferenceError: y"));
    }

    #[test]
    fn test_hint_flag_survives_signature_change_until_pass() {
        let mut streak = ErrorStreak::default();
        for _ in 0..3 {
            streak.record(&failing("TypeError: x"), 3);
        }
        assert!(streak.hint_given);

        for _ in 0..3 {
            let outcome = streak.record(&failing("RangeError: z"), 3);
            assert!(!outcome.should_escalate());
        }

        assert_eq!(streak.record(&passing(), 3), StreakOutcome::Passed);
        assert_eq!(streak, ErrorStreak::default());

        let outcomes: Vec<_> = (0..3)
            .map(|_| streak.record(&failing("RangeError: z"), 3))
            .collect();
        assert!(outcomes[2].should_escalate());
    }

    #[test]
    fn test_plain_test_failures_share_signature() {
        let mut streak = ErrorStreak::default();
        let plain = ExecutionResult {
            test_passed: false,
            test_total: 5,
            ..Default::default()
        };
        streak.record(&plain, 3);
        streak.record(&plain, 3);
        assert_eq!(streak.consecutive_errors, 2);
        assert_eq!(
            streak.last_error_message.as_deref(),
            Some(TEST_FAILURE_SIGNATURE)
        );
    }

    #[test]
    fn test_passing_tests_with_stderr_still_fail() {
        let mut streak = ErrorStreak::default();
        let noisy = ExecutionResult {
            stderr: Some("warning: deprecated".to_string()),
            test_passed: true,
            ..Default::default()
        };
        assert_eq!(
            streak.record(&noisy, 3),
            StreakOutcome::Failed { consecutive: 1 }
        );
    }
}
