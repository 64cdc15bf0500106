//! Errors raised while talking to external collaborators.

use proctor_core::error::ProctorError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum InteractionError {
    /// The service answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        retryable: bool,
        retry_after: Option<Duration>,
    },

    /// The request never got an answer (connect failure, reset, timeout).
    #[error("request failed: {message}")]
    Transport { message: String, timed_out: bool },

    /// The service answered but the body was not what we expected.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// The request could not be built (bad endpoint, missing credentials).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl InteractionError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { retryable, .. } => *retryable,
            Self::Transport { .. } => true,
            Self::InvalidResponse(_) | Self::InvalidRequest(_) => false,
        }
    }

    /// Converts into the domain error, tagging it with the service name.
    pub fn into_proctor_error(self, service: &str) -> ProctorError {
        match self {
            Self::Transport {
                timed_out: true,
                message,
            } => ProctorError::timeout(format!("{} request timed out: {}", service, message)),
            other => ProctorError::external(service, other.to_string()),
        }
    }
}

impl From<reqwest::Error> for InteractionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            return Self::InvalidRequest(err.to_string());
        }
        if err.is_decode() {
            return Self::InvalidResponse(err.to_string());
        }
        Self::Transport {
            timed_out: err.is_timeout(),
            message: err.to_string(),
        }
    }
}
