//! Proactive nudges for candidates who have gone quiet.
//!
//! A session is nudged when ALL of these hold:
//! - the interview is in progress,
//! - the candidate changed the starter code and it is longer than the
//!   minimal-effort threshold,
//! - nothing was edited for longer than the idle threshold,
//! - no nudge was sent yet in this idle stretch.
//!
//! The next edit re-arms the detector (see `InterviewSession::touch`).

use crate::connection_registry::EventSink;
use crate::protocol::OutboundEvent;
use crate::session_store::SessionStore;
use proctor_core::clock::Clock;
use proctor_core::error::Result;
use proctor_core::session::{ChatMessage, InterviewSession, SessionStatus};
use proctor_interaction::SpeechSynthesizer;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub const IDLE_NUDGES: &[&str] = &[
    "You've been quiet for a bit. Want to talk me through what you're thinking?",
    "How's it going? Sometimes explaining your approach out loud helps you spot the next step.",
    "Feeling stuck? Try running your code on the first example and see what it returns.",
    "Take your time. If you'd like a hint, just ask!",
    "What's the trickiest part of the problem for you right now?",
];

/// Fire-and-forget speech; a failure is only logged.
pub(crate) fn speak_detached(speech: &Arc<dyn SpeechSynthesizer>, session_id: &str, text: &str) {
    let speech = Arc::clone(speech);
    let session_id = session_id.to_string();
    let text = text.to_string();
    tokio::spawn(async move {
        if let Err(e) = speech.speak(&session_id, &text).await {
            tracing::warn!("[Speech] Speaking to session {} failed: {}", session_id, e);
        }
    });
}

#[derive(Debug, Clone, Copy)]
pub struct IdlePolicy {
    pub check_interval: Duration,
    pub threshold: Duration,
    pub min_code_length: usize,
}

pub struct IdleDetector {
    store: Arc<SessionStore>,
    sink: Arc<dyn EventSink>,
    speech: Arc<dyn SpeechSynthesizer>,
    clock: Arc<dyn Clock>,
    policy: IdlePolicy,
    voice_enabled: bool,
    watchers: Mutex<HashMap<String, CancellationToken>>,
}

impl IdleDetector {
    pub fn new(
        store: Arc<SessionStore>,
        sink: Arc<dyn EventSink>,
        speech: Arc<dyn SpeechSynthesizer>,
        clock: Arc<dyn Clock>,
        policy: IdlePolicy,
        voice_enabled: bool,
    ) -> Self {
        Self {
            store,
            sink,
            speech,
            clock,
            policy,
            voice_enabled,
            watchers: Mutex::new(HashMap::new()),
        }
    }

    fn is_due(&self, session: &InterviewSession) -> bool {
        if session.idle_nudge_sent || session.status != SessionStatus::InProgress {
            return false;
        }
        if session.current_code == session.initial_code
            || session.current_code.chars().count() <= self.policy.min_code_length
        {
            return false;
        }
        let idle = self.clock.now() - session.last_interaction_at;
        idle.to_std()
            .map(|idle| idle > self.policy.threshold)
            .unwrap_or(false)
    }

    /// Checks one session and nudges it if due.
    ///
    /// # Returns
    ///
    /// The nudge that was appended and delivered, if any.
    pub async fn evaluate(&self, session_id: &str) -> Result<Option<ChatMessage>> {
        // Cheap read first so quiet ticks never write.
        if !self.store.read(session_id, |s| self.is_due(s)).await? {
            return Ok(None);
        }

        let nudge = self
            .store
            .update(session_id, |session| {
                // Re-check under the write lock; an edit may have landed.
                if !self.is_due(session) {
                    return Ok(None);
                }
                let text = IDLE_NUDGES
                    .choose(&mut rand::thread_rng())
                    .copied()
                    .unwrap_or(IDLE_NUDGES[0]);
                let message = ChatMessage::assistant(text, self.clock.now());
                session.append_message(message.clone());
                session.idle_nudge_sent = true;
                Ok(Some(message))
            })
            .await?;

        if let Some(message) = &nudge {
            tracing::info!("[IdleDetector] Nudged idle session {}", session_id);
            self.sink
                .deliver(
                    session_id,
                    OutboundEvent::chat_response(message.clone(), self.voice_enabled),
                )
                .await;
            if self.voice_enabled {
                speak_detached(&self.speech, session_id, &message.content);
            }
        }
        Ok(nudge)
    }

    /// Starts the periodic check for a session. No-op if already watching.
    pub async fn watch(self: &Arc<Self>, session_id: &str) {
        let mut watchers = self.watchers.lock().await;
        if watchers.contains_key(session_id) {
            return;
        }
        let cancel = CancellationToken::new();
        watchers.insert(session_id.to_string(), cancel.clone());
        drop(watchers);

        let detector = Arc::clone(self);
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(detector.policy.check_interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        match detector.evaluate(&session_id).await {
                            Ok(_) => {}
                            Err(e) if e.is_not_found() || e.is_fatal() => {
                                tracing::debug!(
                                    "[IdleDetector] Stopping watch on {}: {}",
                                    session_id,
                                    e
                                );
                                break;
                            }
                            Err(e) => {
                                tracing::warn!(
                                    "[IdleDetector] Check of session {} failed: {}",
                                    session_id,
                                    e
                                );
                            }
                        }
                    }
                }
            }
            // A cancelled token was already removed by `unwatch`, and the
            // entry may now belong to a newer watch.
            let mut watchers = detector.watchers.lock().await;
            if !cancel.is_cancelled() {
                watchers.remove(&session_id);
            }
        });
    }

    /// Stops the periodic check for a session.
    pub async fn unwatch(&self, session_id: &str) {
        if let Some(cancel) = self.watchers.lock().await.remove(session_id) {
            cancel.cancel();
        }
    }

    pub async fn is_watching(&self, session_id: &str) -> bool {
        self.watchers.lock().await.contains_key(session_id)
    }
}
