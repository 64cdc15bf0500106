//! Error types for the Proctor coordinator.

use thiserror::Error;

/// A shared error type for the entire coordinator.
///
/// Variants follow the failure taxonomy the event router relies on when it
/// decides which `*_error` event to emit and whether session state may be
/// touched at all.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProctorError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Malformed inbound payload or an event that is not valid in the
    /// connection's current state.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// A run is already in flight for this session.
    #[error("{0}")]
    Busy(String),

    /// An external collaborator (assistant, sandbox, speech) failed.
    #[error("{service} error: {message}")]
    External { service: String, message: String },

    /// An external call exceeded its deadline.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Work abandoned because its session was released or completed.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// The session store could not apply a mutation. The session is unusable.
    #[error("Session store failure: {0}")]
    Fatal(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProctorError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an External error for the named collaborator
    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::External {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Creates a Timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    /// Creates a Cancelled error
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled(message.into())
    }

    /// Creates a Fatal error
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a protocol/validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if the work was abandoned on purpose
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Check if this error leaves the session unusable
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// Check if this failure came from outside the coordinator and may
    /// succeed on a later attempt.
    ///
    /// Transient failures are reported to the client but never feed the
    /// code-failure streak.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::External { .. } | Self::Timeout(_) | Self::Busy(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ProctorError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ProctorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ProctorError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error, used at the repository seam
impl From<anyhow::Error> for ProctorError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, ProctorError>`.
pub type Result<T> = std::result::Result<T, ProctorError>;
