//! Chat transcript types.
//!
//! Messages are immutable once created: the transcript only ever grows by
//! appending, and no API hands out a mutable reference to a stored message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents the author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the candidate.
    User,
    /// Message from the AI interviewer.
    Assistant,
}

/// A single message in the interview transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message.
    pub content: String,
    /// Creation time, set once.
    pub timestamp: DateTime<Utc>,
    /// True only for assistant messages produced by the repeated-failure
    /// escalation path.
    #[serde(default)]
    pub is_hint: bool,
}

impl ChatMessage {
    /// A message typed by the candidate.
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp,
            is_hint: false,
        }
    }

    /// A regular assistant message (replies, welcome text, idle nudges).
    pub fn assistant(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp,
            is_hint: false,
        }
    }

    /// An escalation hint sent after repeated identical failures.
    pub fn hint(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp,
            is_hint: true,
        }
    }
}
