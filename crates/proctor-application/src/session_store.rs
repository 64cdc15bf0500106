//! Authoritative in-memory record of live sessions, backed by a repository.
//!
//! Every mutation goes through [`SessionStore::update`]: the session lock is
//! held while a draft copy is mutated and persisted, and the draft replaces
//! the live record only after the save succeeded. A failed save leaves the
//! live record untouched and marks the session unusable.

use chrono::{DateTime, Utc};
use proctor_core::clock::Clock;
use proctor_core::error::{ProctorError, Result};
use proctor_core::problem::{Problem, ProblemCatalog};
use proctor_core::session::{
    InterviewSession, SessionRepository, SessionSnapshot, validate_session_id,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};

const DEFAULT_CANDIDATE_NAME: &str = "Candidate";

/// One live session: its state and a poison flag.
struct SessionHandle {
    state: Mutex<InterviewSession>,
    unusable: AtomicBool,
}

impl SessionHandle {
    fn new(session: InterviewSession) -> Self {
        Self {
            state: Mutex::new(session),
            unusable: AtomicBool::new(false),
        }
    }

    fn ensure_usable(&self, session_id: &str) -> Result<()> {
        if self.unusable.load(Ordering::Acquire) {
            Err(ProctorError::fatal(format!(
                "Session {} is unusable after a storage failure",
                session_id
            )))
        } else {
            Ok(())
        }
    }
}

/// Result of a join: the snapshot and whether the session was new.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub snapshot: SessionSnapshot,
    pub created: bool,
}

/// Owns all live sessions. Single writer per session.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<SessionHandle>>>,
    repository: Arc<dyn SessionRepository>,
    catalog: Arc<ProblemCatalog>,
    clock: Arc<dyn Clock>,
    default_problem_id: String,
}

impl SessionStore {
    /// Creates a store.
    ///
    /// # Arguments
    ///
    /// * `repository` - Persistence backend for session documents
    /// * `catalog` - Problems new sessions are bound to
    /// * `clock` - Time source for every timestamp the store writes
    /// * `default_problem_id` - Problem assigned on first join
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        catalog: Arc<ProblemCatalog>,
        clock: Arc<dyn Clock>,
        default_problem_id: impl Into<String>,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            repository,
            catalog,
            clock,
            default_problem_id: default_problem_id.into(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn catalog(&self) -> &ProblemCatalog {
        &self.catalog
    }

    /// The problem a session is bound to.
    pub fn problem(&self, problem_id: &str) -> Result<&Problem> {
        self.catalog
            .get(problem_id)
            .ok_or_else(|| ProctorError::not_found("Problem", problem_id))
    }

    /// Loads, rehydrates or creates the session and returns its snapshot.
    ///
    /// Rejoining an existing session is idempotent: nothing in it changes.
    ///
    /// # Errors
    ///
    /// - `Validation` for a malformed session id
    /// - `Fatal` if the session is unusable or the repository fails
    pub async fn get_or_create(
        &self,
        session_id: &str,
        candidate_name: Option<&str>,
    ) -> Result<JoinOutcome> {
        validate_session_id(session_id)?;

        let existing = self.sessions.read().await.get(session_id).cloned();
        if let Some(handle) = existing {
            handle.ensure_usable(session_id)?;
            let snapshot = handle.state.lock().await.snapshot();
            return Ok(JoinOutcome {
                snapshot,
                created: false,
            });
        }

        let mut sessions = self.sessions.write().await;
        // Another join may have loaded it while we waited for the write lock.
        if let Some(handle) = sessions.get(session_id).cloned() {
            drop(sessions);
            handle.ensure_usable(session_id)?;
            let snapshot = handle.state.lock().await.snapshot();
            return Ok(JoinOutcome {
                snapshot,
                created: false,
            });
        }

        let stored = self
            .repository
            .find_by_id(session_id)
            .await
            .map_err(|e| ProctorError::fatal(format!("Failed to load session {}: {}", session_id, e)))?;

        let (session, created) = match stored {
            Some(session) => {
                tracing::info!("[SessionStore] Rehydrated session {}", session_id);
                (session, false)
            }
            None => {
                let problem = self.problem(&self.default_problem_id)?;
                let name = candidate_name
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .unwrap_or(DEFAULT_CANDIDATE_NAME);
                let session = InterviewSession::new(session_id, name, problem, self.now());
                self.repository.save(&session).await.map_err(|e| {
                    ProctorError::fatal(format!("Failed to persist new session {}: {}", session_id, e))
                })?;
                tracing::info!(
                    "[SessionStore] Created session {} on problem {}",
                    session_id,
                    problem.id
                );
                (session, true)
            }
        };

        let snapshot = session.snapshot();
        sessions.insert(
            session_id.to_string(),
            Arc::new(SessionHandle::new(session)),
        );
        Ok(JoinOutcome { snapshot, created })
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    async fn handle(&self, session_id: &str) -> Result<Arc<SessionHandle>> {
        let handle = self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| ProctorError::not_found("Session", session_id))?;
        handle.ensure_usable(session_id)?;
        Ok(handle)
    }

    /// Runs `reader` against the current state of a session.
    pub async fn read<R, F>(&self, session_id: &str, reader: F) -> Result<R>
    where
        F: FnOnce(&InterviewSession) -> R,
    {
        let handle = self.handle(session_id).await?;
        let session = handle.state.lock().await;
        Ok(reader(&session))
    }

    pub async fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot> {
        self.read(session_id, InterviewSession::snapshot).await
    }

    /// Applies `mutate` and persists the result as one step.
    ///
    /// If `mutate` fails nothing changes. If persisting fails the live
    /// record keeps its previous state, the session is marked unusable and
    /// `Fatal` is returned.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session is not loaded
    /// - whatever `mutate` returns
    /// - `Fatal` on storage failure or if the session is already unusable
    pub async fn update<R, F>(&self, session_id: &str, mutate: F) -> Result<R>
    where
        F: FnOnce(&mut InterviewSession) -> Result<R>,
    {
        let handle = self.handle(session_id).await?;
        let mut live = handle.state.lock().await;
        // Re-check under the lock: a concurrent update may have failed.
        handle.ensure_usable(session_id)?;

        let mut draft = live.clone();
        let output = mutate(&mut draft)?;

        if let Err(e) = self.repository.save(&draft).await {
            handle.unusable.store(true, Ordering::Release);
            tracing::error!(
                "[SessionStore] Persisting session {} failed, marking unusable: {:#}",
                session_id,
                e
            );
            return Err(ProctorError::fatal(format!(
                "Failed to persist session {}: {}",
                session_id, e
            )));
        }

        *live = draft;
        Ok(output)
    }

    /// Applies `mutate` in memory only. Used for high-frequency bookkeeping
    /// (idle tracking) that rides along with the next persisted update.
    pub async fn update_volatile<R, F>(&self, session_id: &str, mutate: F) -> Result<R>
    where
        F: FnOnce(&mut InterviewSession) -> R,
    {
        let handle = self.handle(session_id).await?;
        let mut live = handle.state.lock().await;
        Ok(mutate(&mut live))
    }

    /// Drops a session from memory. It stays in the repository.
    pub async fn evict(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            tracing::debug!("[SessionStore] Evicted session {}", session_id);
        }
        removed
    }
}
