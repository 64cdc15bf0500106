//! Interview session domain model.

use super::message::ChatMessage;
use crate::error::{ProctorError, Result};
use crate::execution::{ErrorStreak, ExecutionResult};
use crate::problem::Problem;
use crate::proctoring::{ProctoringCounters, ProctoringEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Upper bound on the length of a client-chosen session id.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Checks that a client-supplied session id is usable as a storage key.
///
/// Accepted: 1 to `MAX_SESSION_ID_LEN` characters from `[A-Za-z0-9_-]`.
pub fn validate_session_id(session_id: &str) -> Result<()> {
    let well_formed = !session_id.is_empty()
        && session_id.len() <= MAX_SESSION_ID_LEN
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if well_formed {
        Ok(())
    } else {
        Err(ProctorError::validation(format!(
            "Invalid session id '{}'",
            session_id
        )))
    }
}

/// Lifecycle state of an interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    /// Created (or rejoined) but not yet started.
    #[default]
    Waiting,
    /// Started by an explicit start signal.
    InProgress,
    /// Ended explicitly. Proctoring events are still recorded for audit.
    Completed,
}

/// The authoritative record of one candidate's interview attempt.
///
/// A session contains:
/// - The problem it is bound to (immutable after creation)
/// - The last committed editor contents
/// - The append-only chat transcript
/// - The repeated-failure streak and the run log
/// - Proctoring counters and their audit log
/// - Idle tracking (`last_interaction_at`, `idle_nudge_sent`)
///
/// Only the session store mutates a session; every other component goes
/// through its operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSession {
    pub session_id: String,
    pub candidate_name: String,
    pub problem_id: String,
    pub problem_title: String,
    pub initial_code: String,
    #[serde(default)]
    pub status: SessionStatus,
    pub current_code: String,
    #[serde(default)]
    chat_history: Vec<ChatMessage>,
    #[serde(flatten)]
    pub streak: ErrorStreak,
    #[serde(default)]
    pub proctoring_counters: ProctoringCounters,
    #[serde(default)]
    pub proctoring_events: Vec<ProctoringEvent>,
    /// Run log, oldest first.
    #[serde(default)]
    pub executions: Vec<ExecutionResult>,
    #[serde(default)]
    pub last_execution: Option<ExecutionResult>,
    pub last_interaction_at: DateTime<Utc>,
    /// Whether a proactive nudge was already sent for the current idle stretch.
    #[serde(default)]
    pub idle_nudge_sent: bool,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl InterviewSession {
    /// Creates a fresh session bound to `problem`, greeted with the problem's
    /// welcome message.
    pub fn new(
        session_id: impl Into<String>,
        candidate_name: impl Into<String>,
        problem: &Problem,
        now: DateTime<Utc>,
    ) -> Self {
        let candidate_name = candidate_name.into();
        let welcome = ChatMessage::assistant(problem.welcome_message(&candidate_name), now);
        Self {
            session_id: session_id.into(),
            candidate_name,
            problem_id: problem.id.clone(),
            problem_title: problem.title.clone(),
            initial_code: problem.initial_code.clone(),
            status: SessionStatus::Waiting,
            current_code: problem.initial_code.clone(),
            chat_history: vec![welcome],
            streak: ErrorStreak::default(),
            proctoring_counters: ProctoringCounters::default(),
            proctoring_events: Vec::new(),
            executions: Vec::new(),
            last_execution: None,
            last_interaction_at: now,
            idle_nudge_sent: false,
            started_at: None,
            completed_at: None,
            created_at: now,
        }
    }

    /// The transcript in conversation order.
    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat_history
    }

    /// Appends a message to the transcript.
    pub fn append_message(&mut self, message: ChatMessage) {
        self.chat_history.push(message);
    }

    /// The last `limit` messages of the transcript.
    pub fn recent_messages(&self, limit: usize) -> &[ChatMessage] {
        let start = self.chat_history.len().saturating_sub(limit);
        &self.chat_history[start..]
    }

    /// Records editing activity: resets the idle clock and re-arms the nudge.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_interaction_at = now;
        self.idle_nudge_sent = false;
    }

    /// Appends a finished run to the run log.
    pub fn record_execution(&mut self, result: ExecutionResult) {
        self.last_execution = Some(result.clone());
        self.executions.push(result);
    }

    /// `waiting -> in_progress`.
    ///
    /// # Errors
    ///
    /// Returns `ProctorError::Validation` from any other state.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.status {
            SessionStatus::Waiting => {
                self.status = SessionStatus::InProgress;
                self.started_at = Some(now);
                Ok(())
            }
            other => Err(ProctorError::validation(format!(
                "Cannot start session {} in state {}",
                self.session_id, other
            ))),
        }
    }

    /// `in_progress -> completed`.
    ///
    /// # Errors
    ///
    /// Returns `ProctorError::Validation` from any other state.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.status {
            SessionStatus::InProgress => {
                self.status = SessionStatus::Completed;
                self.completed_at = Some(now);
                Ok(())
            }
            other => Err(ProctorError::validation(format!(
                "Cannot end session {} in state {}",
                self.session_id, other
            ))),
        }
    }

    /// Complete view of the session handed to a (re)joining client.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            problem_title: self.problem_title.clone(),
            initial_code: self.current_code.clone(),
            chat_history: self.chat_history.clone(),
            status: self.status,
        }
    }
}

/// Catch-up state returned on join.
///
/// `initial_code` carries the last committed editor contents so a
/// reconnecting client resumes where it left off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub problem_title: String,
    pub initial_code: String,
    pub chat_history: Vec<ChatMessage>,
    pub status: SessionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ProblemCatalog;

    fn session() -> InterviewSession {
        let catalog = ProblemCatalog::builtin();
        InterviewSession::new("s-1", "Ada", catalog.get("two-sum").unwrap(), Utc::now())
    }

    #[test]
    fn test_new_session_is_waiting_with_welcome() {
        let session = session();
        assert_eq!(session.status, SessionStatus::Waiting);
        assert_eq!(session.problem_title, "Two Sum");
        assert_eq!(session.current_code, session.initial_code);
        assert_eq!(session.chat_history().len(), 1);
        assert!(!session.chat_history()[0].is_hint);
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut session = session();
        assert!(session.complete(Utc::now()).is_err());

        session.start(Utc::now()).unwrap();
        assert_eq!(session.status, SessionStatus::InProgress);
        assert!(session.started_at.is_some());
        assert!(session.start(Utc::now()).unwrap_err().is_validation());

        session.complete(Utc::now()).unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert!(session.completed_at.is_some());
        assert!(session.complete(Utc::now()).is_err());
    }

    #[test]
    fn test_touch_rearms_idle_nudge() {
        let mut session = session();
        session.idle_nudge_sent = true;
        let later = session.last_interaction_at + chrono::Duration::seconds(5);
        session.touch(later);
        assert!(!session.idle_nudge_sent);
        assert_eq!(session.last_interaction_at, later);
    }

    #[test]
    fn test_snapshot_uses_current_code() {
        let mut session = session();
        session.current_code = "function twoSum() { return [0, 1]; }".to_string();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.initial_code, session.current_code);
        assert_eq!(snapshot.chat_history.len(), 1);
    }

    #[test]
    fn test_recent_messages_clamps() {
        let mut session = session();
        for i in 0..5 {
            session.append_message(ChatMessage::user(format!("m{i}"), Utc::now()));
        }
        assert_eq!(session.recent_messages(3).len(), 3);
        assert_eq!(session.recent_messages(3)[2].content, "m4");
        assert_eq!(session.recent_messages(100).len(), 6);
    }

    #[test]
    fn test_session_id_validation() {
        assert!(validate_session_id("session-1_abc").is_ok());
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id("../etc/passwd").is_err());
        assert!(validate_session_id("a b").is_err());
        assert!(validate_session_id(&"x".repeat(MAX_SESSION_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_persisted_document_is_flat() {
        let mut session = session();
        session.streak.consecutive_errors = 2;
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["consecutive_errors"], 2);
        assert_eq!(value["status"], "waiting");

        let restored: InterviewSession = serde_json::from_value(value).unwrap();
        assert_eq!(restored, session);
    }
}
