//! Text-to-speech side channel.
//!
//! Speech is best effort: callers fire it and log failures, and nothing in
//! the session state depends on it.

use crate::error::InteractionError;
use async_trait::async_trait;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speaks `text` to the candidate of `session_id`.
    async fn speak(&self, session_id: &str, text: &str) -> Result<(), InteractionError>;
}

/// Synthesis happens in the browser (the client reads the `speak` flag of
/// `chat_response`), so the server-side synthesizer only records the request.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClientSideSpeech;

#[async_trait]
impl SpeechSynthesizer for ClientSideSpeech {
    async fn speak(&self, session_id: &str, text: &str) -> Result<(), InteractionError> {
        tracing::debug!(
            "[ClientSideSpeech] Session {} speaks {} chars",
            session_id,
            text.chars().count()
        );
        Ok(())
    }
}
