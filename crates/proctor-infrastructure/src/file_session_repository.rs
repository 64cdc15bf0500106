//! JSON-file-backed `SessionRepository`.
//!
//! Directory structure:
//! ```text
//! sessions_dir/
//! ├── session-id-1.json
//! └── session-id-2.json
//! ```

use crate::paths::ProctorPaths;
use crate::storage::AtomicJsonFile;
use anyhow::{Context, Result};
use async_trait::async_trait;
use proctor_core::session::{InterviewSession, SessionRepository, validate_session_id};
use std::path::{Path, PathBuf};
use tokio::task;

/// Stores each session as `<sessions_dir>/<session_id>.json`.
///
/// # Features
///
/// - **Atomic writes**: tmp file + fsync + rename per save
/// - **Async-safe**: blocking file I/O runs on `spawn_blocking`
///
/// Writes to the same session must be serialized by the caller; the session
/// store does this by holding the session lock across `save`.
pub struct FileSessionRepository {
    sessions_dir: PathBuf,
}

impl FileSessionRepository {
    /// Creates a repository rooted at `sessions_dir`, creating the directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn new(sessions_dir: impl AsRef<Path>) -> Result<Self> {
        let sessions_dir = sessions_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&sessions_dir)
            .await
            .with_context(|| format!("Failed to create {}", sessions_dir.display()))?;
        Ok(Self { sessions_dir })
    }

    /// Creates a repository at the default location (`~/.config/proctor/sessions`).
    pub async fn default_location() -> Result<Self> {
        let dir = ProctorPaths::sessions_dir()
            .map_err(|e| anyhow::anyhow!("Failed to get sessions directory: {}", e))?;
        Self::new(dir).await
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn file_for(&self, session_id: &str) -> Result<AtomicJsonFile<InterviewSession>> {
        // Ids become file names; reject anything that could escape the directory.
        validate_session_id(session_id)?;
        Ok(AtomicJsonFile::new(
            self.sessions_dir.join(format!("{}.json", session_id)),
        ))
    }

    fn list_all_sync(dir: &Path) -> Result<Vec<InterviewSession>> {
        let mut sessions = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_document = path.extension().is_some_and(|ext| ext == "json")
                && !path
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy().starts_with('.'));
            if !is_document {
                continue;
            }

            match AtomicJsonFile::<InterviewSession>::new(path.clone()).load() {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        "[FileSessionRepository] Skipping unreadable {}: {}",
                        path.display(),
                        e
                    );
                }
            }
        }
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }
}

#[async_trait]
impl SessionRepository for FileSessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<InterviewSession>> {
        let file = self.file_for(session_id)?;
        task::spawn_blocking(move || file.load())
            .await
            .context("Failed to spawn blocking task")?
            .with_context(|| format!("Failed to load session {}", session_id))
    }

    async fn save(&self, session: &InterviewSession) -> Result<()> {
        let file = self.file_for(&session.session_id)?;
        let session = session.clone();
        let session_id = session.session_id.clone();
        task::spawn_blocking(move || file.save(&session))
            .await
            .context("Failed to spawn blocking task")?
            .with_context(|| format!("Failed to save session {}", session_id))?;
        tracing::debug!("[FileSessionRepository] Saved session {}", session_id);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let file = self.file_for(session_id)?;
        task::spawn_blocking(move || file.remove())
            .await
            .context("Failed to spawn blocking task")?
            .with_context(|| format!("Failed to delete session {}", session_id))
    }

    async fn list_all(&self) -> Result<Vec<InterviewSession>> {
        let dir = self.sessions_dir.clone();
        task::spawn_blocking(move || Self::list_all_sync(&dir))
            .await
            .context("Failed to spawn blocking task")?
    }
}
