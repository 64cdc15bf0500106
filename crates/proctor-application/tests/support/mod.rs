//! Hand-written test doubles shared by the integration tests.
#![allow(dead_code)]

use anyhow::{Result as AnyResult, bail};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use proctor_application::protocol::OutboundEvent;
use proctor_application::{EventSink, SessionStore};
use proctor_core::clock::Clock;
use proctor_core::execution::ExecutionResult;
use proctor_core::problem::ProblemCatalog;
use proctor_core::session::{InterviewSession, SessionRepository};
use proctor_infrastructure::InMemorySessionRepository;
use proctor_interaction::{
    Assistant, ChatContext, CodeSandbox, HintContext, InteractionError, PollStatus,
    SpeechSynthesizer,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

async fn pause_for(delay_ms: &AtomicU64) {
    let ms = delay_ms.load(Ordering::SeqCst);
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// In-memory repository that counts saves and can be told to fail or to
/// stall.
#[derive(Default)]
pub struct CountingRepository {
    inner: InMemorySessionRepository,
    saves: AtomicUsize,
    saved_code: Mutex<Vec<String>>,
    fail_saves: AtomicBool,
    save_delay_ms: AtomicU64,
}

impl CountingRepository {
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// `current_code` of every saved document, in save order.
    pub fn saved_code(&self) -> Vec<String> {
        self.saved_code.lock().unwrap().clone()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Every later save sleeps for `delay` first. The session lock is held
    /// meanwhile.
    pub fn delay_saves(&self, delay: Duration) {
        self.save_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionRepository for CountingRepository {
    async fn find_by_id(&self, session_id: &str) -> AnyResult<Option<InterviewSession>> {
        self.inner.find_by_id(session_id).await
    }

    async fn save(&self, session: &InterviewSession) -> AnyResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            bail!("disk full");
        }
        pause_for(&self.save_delay_ms).await;
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.saved_code
            .lock()
            .unwrap()
            .push(session.current_code.clone());
        self.inner.save(session).await
    }

    async fn delete(&self, session_id: &str) -> AnyResult<()> {
        self.inner.delete(session_id).await
    }

    async fn list_all(&self) -> AnyResult<Vec<InterviewSession>> {
        self.inner.list_all().await
    }
}

/// Clock moved by hand.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        *self.now.lock().unwrap() += ChronoDuration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Sandbox that answers every submission from a script.
///
/// Each submission takes the next scripted result (the last one repeats)
/// and reports `Pending` for `pending_polls` polls first. With `hang` set a
/// submission never finishes. `health_failure` makes the health check
/// answer with that HTTP status.
#[derive(Default)]
pub struct ScriptedSandbox {
    script: Mutex<VecDeque<ExecutionResult>>,
    runs: Mutex<HashMap<String, (usize, ExecutionResult)>>,
    pending_polls: usize,
    hang: bool,
    health_failure: Option<u16>,
    submissions: AtomicUsize,
    sources: Mutex<Vec<String>>,
}

impl ScriptedSandbox {
    pub fn returning(results: Vec<ExecutionResult>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            ..Default::default()
        }
    }

    pub fn with_pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    pub fn with_health_failure(mut self, status: u16) -> Self {
        self.health_failure = Some(status);
        self
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn last_source(&self) -> Option<String> {
        self.sources.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CodeSandbox for ScriptedSandbox {
    async fn submit(&self, source_code: &str) -> Result<String, InteractionError> {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst);
        self.sources.lock().unwrap().push(source_code.to_string());
        let token = format!("token-{n}");

        let mut script = self.script.lock().unwrap();
        let result = if script.len() > 1 {
            script.pop_front().unwrap_or_default()
        } else {
            script.front().cloned().unwrap_or_default()
        };
        self.runs
            .lock()
            .unwrap()
            .insert(token.clone(), (self.pending_polls, result));
        Ok(token)
    }

    async fn poll(&self, token: &str) -> Result<PollStatus, InteractionError> {
        if self.hang {
            return Ok(PollStatus::Pending);
        }
        let mut runs = self.runs.lock().unwrap();
        let Some((pending, result)) = runs.get_mut(token) else {
            return Err(InteractionError::InvalidResponse(format!(
                "unknown token {token}"
            )));
        };
        if *pending > 0 {
            *pending -= 1;
            return Ok(PollStatus::Pending);
        }
        Ok(PollStatus::Finished(result.clone()))
    }

    async fn health(&self) -> Result<(), InteractionError> {
        match self.health_failure {
            Some(status) => Err(InteractionError::Http {
                status,
                message: "unavailable".to_string(),
                retryable: true,
                retry_after: None,
            }),
            None => Ok(()),
        }
    }
}

/// Assistant with fixed answers; either call can be made to fail.
#[derive(Default)]
pub struct MockAssistant {
    pub fail_replies: AtomicBool,
    pub fail_hints: AtomicBool,
    hint_calls: AtomicUsize,
    contexts: Mutex<Vec<ChatContext>>,
    reply_delay_ms: AtomicU64,
}

impl MockAssistant {
    pub fn hint_calls(&self) -> usize {
        self.hint_calls.load(Ordering::SeqCst)
    }

    pub fn last_context(&self) -> Option<ChatContext> {
        self.contexts.lock().unwrap().last().cloned()
    }

    /// Replies take `delay` to arrive.
    pub fn delay_replies(&self, delay: Duration) {
        self.reply_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl Assistant for MockAssistant {
    async fn reply(&self, context: &ChatContext, message: &str) -> Result<String, InteractionError> {
        self.contexts.lock().unwrap().push(context.clone());
        pause_for(&self.reply_delay_ms).await;
        if self.fail_replies.load(Ordering::SeqCst) {
            return Err(InteractionError::Http {
                status: 503,
                message: "overloaded".to_string(),
                retryable: true,
                retry_after: None,
            });
        }
        Ok(format!("You asked: {message}"))
    }

    async fn hint(&self, context: &HintContext) -> Result<String, InteractionError> {
        self.hint_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_hints.load(Ordering::SeqCst) {
            return Err(InteractionError::Transport {
                message: "connection reset".to_string(),
                timed_out: false,
            });
        }
        Ok(format!("Look at `{}` again", context.error))
    }
}

/// Speech that always fails.
#[derive(Default)]
pub struct BrokenSpeech {
    pub calls: AtomicUsize,
}

#[async_trait]
impl SpeechSynthesizer for BrokenSpeech {
    async fn speak(&self, _session_id: &str, _text: &str) -> Result<(), InteractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(InteractionError::InvalidRequest("no voice".to_string()))
    }
}

/// Sink that records every delivered event.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, OutboundEvent)>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<(String, OutboundEvent)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn deliver(&self, session_id: &str, event: OutboundEvent) {
        self.events
            .lock()
            .unwrap()
            .push((session_id.to_string(), event));
    }
}

pub fn store(repository: Arc<dyn SessionRepository>, clock: Arc<dyn Clock>) -> Arc<SessionStore> {
    Arc::new(SessionStore::new(
        repository,
        Arc::new(ProblemCatalog::builtin()),
        clock,
        "two-sum",
    ))
}

pub fn failing_run(stderr: &str) -> ExecutionResult {
    ExecutionResult {
        stderr: Some(stderr.to_string()),
        status: "Runtime Error (NZEC)".to_string(),
        test_passed: false,
        ..Default::default()
    }
}

pub fn passing_run() -> ExecutionResult {
    ExecutionResult {
        stdout: Some("5/5 tests passed".to_string()),
        status: "Accepted".to_string(),
        test_passed: true,
        test_total: 5,
        ..Default::default()
    }
}
