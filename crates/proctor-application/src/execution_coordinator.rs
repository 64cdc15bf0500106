//! Runs candidate code in the sandbox and folds results into the session.
//!
//! At most one run per session is in flight; a second request is rejected
//! with `Busy` so the failure streak is never updated concurrently.

use crate::session_store::SessionStore;
use proctor_core::error::{ProctorError, Result};
use proctor_core::execution::{ExecutionResult, StreakOutcome};
use proctor_core::session::{ChatMessage, SessionStatus};
use proctor_interaction::{
    Assistant, CANNED_HINT, CodeSandbox, HintContext, InteractionError, PollStatus,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

pub const HINT_PREFIX: &str = "💡 **Hint:** ";

#[derive(Debug, Clone, Copy)]
pub struct ExecutionPolicy {
    /// Deadline for a whole run, submission included.
    pub timeout: Duration,
    /// Upper bound of the poll backoff.
    pub poll_interval: Duration,
    /// Delay before the first poll; doubles up to `poll_interval`.
    pub initial_poll_delay: Duration,
    pub streak_threshold: u32,
}

/// Proof that the holder is the session's only run in flight. Released on drop.
#[derive(Debug)]
pub struct RunPermit {
    session_id: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl RunPermit {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.session_id);
    }
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub result: ExecutionResult,
    pub streak: StreakOutcome,
    /// The escalation hint appended to the transcript, if this run crossed
    /// the streak threshold.
    pub hint: Option<ChatMessage>,
}

pub struct ExecutionCoordinator {
    store: Arc<SessionStore>,
    sandbox: Arc<dyn CodeSandbox>,
    assistant: Arc<dyn Assistant>,
    policy: ExecutionPolicy,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl ExecutionCoordinator {
    pub fn new(
        store: Arc<SessionStore>,
        sandbox: Arc<dyn CodeSandbox>,
        assistant: Arc<dyn Assistant>,
        policy: ExecutionPolicy,
    ) -> Self {
        Self {
            store,
            sandbox,
            assistant,
            policy,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Claims the session's run slot.
    ///
    /// # Errors
    ///
    /// - `Busy` if a run is already in flight
    /// - `Validation` if the session is completed
    /// - `NotFound`/`Fatal` if the session is not live
    pub async fn begin(&self, session_id: &str) -> Result<RunPermit> {
        let status = self.store.read(session_id, |s| s.status).await?;
        if status == SessionStatus::Completed {
            return Err(ProctorError::validation("Session is completed"));
        }

        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(session_id.to_string()) {
            return Err(ProctorError::Busy(
                "Code is already running for this session".to_string(),
            ));
        }
        Ok(RunPermit {
            session_id: session_id.to_string(),
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn is_running(&self, session_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(session_id)
    }

    /// Executes `code` (or the last committed code) against the session's
    /// problem and updates the failure streak.
    ///
    /// Infrastructure failures (sandbox down, timeout) return an error and
    /// leave the streak untouched. If the session disappeared while the run
    /// was in flight the result is discarded and `NotFound` is returned.
    pub async fn run(&self, permit: RunPermit, code: Option<String>) -> Result<RunOutcome> {
        let session_id = permit.session_id().to_string();
        let (problem_id, committed_code) = self
            .store
            .read(&session_id, |s| (s.problem_id.clone(), s.current_code.clone()))
            .await?;
        let code = code.unwrap_or(committed_code);
        let problem = self.store.problem(&problem_id).map_err(|_| {
            ProctorError::validation(format!("No test cases found for problem: {}", problem_id))
        })?;
        let submission = problem.build_submission(&code);

        tracing::info!(
            "[ExecutionCoordinator] Running {} bytes for session {} ({})",
            code.len(),
            session_id,
            problem_id
        );

        let result = self.execute_with_deadline(&submission).await?;

        let threshold = self.policy.streak_threshold;
        let recorded = result.clone();
        let update = self
            .store
            .update(&session_id, move |session| {
                let streak = session.streak.record(&recorded, threshold);
                session.record_execution(recorded);
                Ok((
                    streak,
                    session.problem_title.clone(),
                    session.current_code.clone(),
                ))
            })
            .await;

        let (streak, problem_title, current_code) = match update {
            Ok(values) => values,
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    "[ExecutionCoordinator] Session {} is gone, discarding run result",
                    session_id
                );
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let hint = match streak {
            StreakOutcome::Escalate { consecutive } => {
                let context = HintContext {
                    problem_title,
                    current_code: if code.trim().is_empty() { current_code } else { code },
                    error: result.error_signature(),
                    consecutive_errors: consecutive,
                };
                Some(self.escalate(&session_id, &context).await?)
            }
            _ => None,
        };

        drop(permit);
        Ok(RunOutcome {
            result,
            streak,
            hint,
        })
    }

    /// Runs `code` against a problem outside any session. Nothing is
    /// recorded and no run slot is taken.
    ///
    /// # Errors
    ///
    /// - `Validation` for an unknown problem
    /// - `External`/`Timeout` if the sandbox fails
    pub async fn run_detached(&self, problem_id: &str, code: &str) -> Result<ExecutionResult> {
        let problem = self.store.problem(problem_id).map_err(|_| {
            ProctorError::validation(format!("No test cases found for problem: {}", problem_id))
        })?;
        tracing::info!(
            "[ExecutionCoordinator] Detached run of {} bytes ({})",
            code.len(),
            problem_id
        );
        self.execute_with_deadline(&problem.build_submission(code))
            .await
    }

    /// Sandbox reachability as reported by the health endpoint:
    /// `connected`, `error: <status>` or `unreachable: <reason>`.
    pub async fn sandbox_status(&self) -> String {
        match self.sandbox.health().await {
            Ok(()) => "connected".to_string(),
            Err(InteractionError::Http { status, .. }) => format!("error: {}", status),
            Err(e) => format!("unreachable: {}", e),
        }
    }

    async fn execute_with_deadline(&self, source: &str) -> Result<ExecutionResult> {
        match tokio::time::timeout(self.policy.timeout, self.execute(source)).await {
            Ok(result) => result,
            Err(_) => Err(ProctorError::timeout(format!(
                "Execution timed out after {} seconds",
                self.policy.timeout.as_secs()
            ))),
        }
    }

    /// Submits and polls with exponential backoff until the run finishes.
    async fn execute(&self, source: &str) -> Result<ExecutionResult> {
        let token = loop {
            match self.sandbox.submit(source).await {
                Ok(token) => break token,
                Err(e) if e.is_retryable() => {
                    tracing::warn!(
                        "[ExecutionCoordinator] Submission failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(self.policy.poll_interval).await;
                }
                Err(e) => return Err(e.into_proctor_error("sandbox")),
            }
        };

        let mut delay = self.policy.initial_poll_delay;
        loop {
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(self.policy.poll_interval);

            match self.sandbox.poll(&token).await {
                Ok(PollStatus::Finished(result)) => return Ok(result),
                Ok(PollStatus::Pending) => {}
                Err(e) if e.is_retryable() => {
                    tracing::warn!("[ExecutionCoordinator] Poll of {} failed: {}", token, e);
                }
                Err(e) => return Err(e.into_proctor_error("sandbox")),
            }
        }
    }

    /// Appends the single escalation hint for the current streak.
    async fn escalate(&self, session_id: &str, context: &HintContext) -> Result<ChatMessage> {
        let text = match self.assistant.hint(context).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    "[ExecutionCoordinator] Hint generation for {} failed, using canned hint: {}",
                    session_id,
                    e
                );
                CANNED_HINT.to_string()
            }
        };

        let now = self.store.now();
        let message = ChatMessage::hint(format!("{}{}", HINT_PREFIX, text.trim()), now);
        let appended = message.clone();
        self.store
            .update(session_id, move |session| {
                session.append_message(appended);
                Ok(())
            })
            .await?;

        tracing::info!(
            "[ExecutionCoordinator] Sent hint to session {} after {} identical failures",
            session_id,
            context.consecutive_errors
        );
        Ok(message)
    }
}
