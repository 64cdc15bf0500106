//! Candidate chat: records the message, asks the assistant, records the reply.
//!
//! Assistant calls of a session share one cancellation token. Releasing or
//! completing the session cancels it, so a late reply is neither recorded
//! nor delivered.

use crate::session_store::SessionStore;
use proctor_core::error::{ProctorError, Result};
use proctor_core::session::ChatMessage;
use proctor_interaction::{Assistant, ChatContext};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// How many earlier messages the assistant sees.
pub const CONTEXT_MESSAGES: usize = 10;

pub struct ChatService {
    store: Arc<SessionStore>,
    assistant: Arc<dyn Assistant>,
    in_flight: Mutex<HashMap<String, CancellationToken>>,
}

impl ChatService {
    pub fn new(store: Arc<SessionStore>, assistant: Arc<dyn Assistant>) -> Self {
        Self {
            store,
            assistant,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Token shared by the session's pending assistant calls.
    pub async fn cancel_token(&self, session_id: &str) -> CancellationToken {
        self.in_flight
            .lock()
            .await
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Abandons every pending assistant call of the session. Later messages
    /// get a fresh token.
    pub async fn cancel(&self, session_id: &str) {
        if let Some(token) = self.in_flight.lock().await.remove(session_id) {
            token.cancel();
        }
    }

    /// Answers one candidate message.
    ///
    /// The candidate's message is persisted before the assistant is called
    /// and stays in the transcript even if the assistant fails.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty message
    /// - `External`/`Timeout` if the assistant fails; no reply is recorded
    /// - `Cancelled` if the session was released or completed meanwhile
    pub async fn send(&self, session_id: &str, message: &str) -> Result<ChatMessage> {
        let cancel = self.cancel_token(session_id).await;
        self.send_until(session_id, message, &cancel).await
    }

    /// [`send`](Self::send) bound to a token taken earlier.
    pub async fn send_until(
        &self,
        session_id: &str,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ProctorError::validation("Message must not be empty"));
        }

        let now = self.store.now();
        let user_message = ChatMessage::user(message, now);
        let catalog_hints = |problem_id: &str| {
            self.store
                .catalog()
                .get(problem_id)
                .map(|p| p.hints.clone())
                .unwrap_or_default()
        };

        let context = self
            .store
            .update(session_id, |session| {
                let context = ChatContext {
                    problem_title: session.problem_title.clone(),
                    current_code: session.current_code.clone(),
                    last_error: session
                        .last_execution
                        .as_ref()
                        .filter(|r| r.is_failure())
                        .map(|r| r.error_signature()),
                    history: session.recent_messages(CONTEXT_MESSAGES).to_vec(),
                    problem_hints: catalog_hints(&session.problem_id),
                };
                session.append_message(user_message);
                Ok(context)
            })
            .await?;

        let abandoned = || {
            ProctorError::cancelled(format!("Chat in session {} was abandoned", session_id))
        };
        let reply = tokio::select! {
            _ = cancel.cancelled() => return Err(abandoned()),
            reply = self.assistant.reply(&context, message) => reply,
        };
        let text = reply.map_err(|e| {
            tracing::warn!(
                "[ChatService] Assistant failed for session {}: {}",
                session_id,
                e
            );
            e.into_proctor_error("assistant")
        })?;

        let reply = ChatMessage::assistant(text, self.store.now());
        let recorded = reply.clone();
        // Checked under the session lock: release cancels before it evicts.
        self.store
            .update(session_id, |session| {
                if cancel.is_cancelled() {
                    return Err(abandoned());
                }
                session.append_message(recorded);
                Ok(())
            })
            .await?;

        tracing::debug!("[ChatService] Replied in session {}", session_id);
        Ok(reply)
    }
}
