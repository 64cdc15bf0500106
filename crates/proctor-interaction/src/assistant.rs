//! The conversational interviewer collaborator.

use crate::error::InteractionError;
use async_trait::async_trait;
use proctor_core::session::ChatMessage;

/// What the assistant sees when answering a candidate message.
#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    pub problem_title: String,
    pub current_code: String,
    /// Error output of the most recent failed run, if any.
    pub last_error: Option<String>,
    /// Recent transcript, oldest first, excluding the message being answered.
    pub history: Vec<ChatMessage>,
    /// Problem-specific hints the assistant may draw on.
    pub problem_hints: Vec<String>,
}

/// What the assistant sees when asked for a repeated-failure hint.
#[derive(Debug, Clone, Default)]
pub struct HintContext {
    pub problem_title: String,
    pub current_code: String,
    pub error: String,
    pub consecutive_errors: u32,
}

/// An interviewer that answers messages and produces hints.
///
/// Implementations are network-bound and may fail; callers decide how a
/// failure surfaces (a `chat_error`, or a canned hint).
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Answers one candidate message.
    async fn reply(&self, context: &ChatContext, message: &str) -> Result<String, InteractionError>;

    /// Produces a short hint for a candidate stuck on the same error.
    async fn hint(&self, context: &HintContext) -> Result<String, InteractionError>;
}
