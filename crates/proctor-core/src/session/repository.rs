//! Session repository trait.
//!
//! Defines the interface for session persistence operations.

use super::model::InterviewSession;
use anyhow::Result;
use async_trait::async_trait;

/// An abstract repository for persisting interview sessions.
///
/// Decouples the session store from the storage mechanism (JSON files,
/// memory, a database). Errors are reported as `anyhow::Error`; the caller
/// decides how a storage failure affects the session.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Finds a session by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(InterviewSession))`: Session found
    /// - `Ok(None)`: Session not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, session_id: &str) -> Result<Option<InterviewSession>>;

    /// Saves (creates or replaces) a session.
    ///
    /// A successful return means the whole document was written; a failed
    /// save must leave the previously stored document intact.
    async fn save(&self, session: &InterviewSession) -> Result<()>;

    /// Deletes a session. Deleting an unknown session is not an error.
    async fn delete(&self, session_id: &str) -> Result<()>;

    /// Lists all stored sessions.
    async fn list_all(&self) -> Result<Vec<InterviewSession>>;
}
