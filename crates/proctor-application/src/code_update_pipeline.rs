//! Debounced commits of editor contents.
//!
//! Every edit replaces the pending value for its session and restarts the
//! quiet-window timer; only when the window elapses without another edit is
//! the value committed to the session store. A commit runs while holding the
//! session's slot lock, so `flush` waits for an in-flight commit instead of
//! racing it, and a newer edit can never be overwritten by an older one.

use crate::session_store::SessionStore;
use proctor_core::error::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

struct PendingEdit {
    code: String,
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct SlotState {
    pending: Option<PendingEdit>,
    generation: u64,
}

#[derive(Default)]
struct Slot {
    state: Mutex<SlotState>,
}

pub struct CodeUpdatePipeline {
    store: Arc<SessionStore>,
    quiet_window: Duration,
    slots: Mutex<HashMap<String, Arc<Slot>>>,
}

impl CodeUpdatePipeline {
    pub fn new(store: Arc<SessionStore>, quiet_window: Duration) -> Self {
        Self {
            store,
            quiet_window,
            slots: Mutex::new(HashMap::new()),
        }
    }

    async fn slot(&self, session_id: &str) -> Arc<Slot> {
        self.slots
            .lock()
            .await
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Accepts one edit.
    ///
    /// Resets the session's idle clock immediately; the code itself is
    /// committed once no further edit arrives for the quiet window.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`/`Fatal` if the session is not live.
    pub async fn on_code_edit(self: &Arc<Self>, session_id: &str, code: String) -> Result<()> {
        let now = self.store.now();
        self.store
            .update_volatile(session_id, |session| session.touch(now))
            .await?;

        let slot = self.slot(session_id).await;
        let (generation, cancel) = {
            let mut state = slot.state.lock().await;
            if let Some(previous) = state.pending.take() {
                previous.cancel.cancel();
            }
            state.generation += 1;
            let cancel = CancellationToken::new();
            state.pending = Some(PendingEdit {
                code,
                generation: state.generation,
                cancel: cancel.clone(),
            });
            (state.generation, cancel)
        };

        let pipeline = Arc::clone(self);
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(pipeline.quiet_window) => {
                    pipeline.commit_if_current(&session_id, generation).await;
                }
            }
        });
        Ok(())
    }

    async fn commit_if_current(&self, session_id: &str, generation: u64) {
        let slot = self.slots.lock().await.get(session_id).cloned();
        let Some(slot) = slot else {
            return;
        };
        let mut state = slot.state.lock().await;
        let is_current = state
            .pending
            .as_ref()
            .is_some_and(|pending| pending.generation == generation);
        if !is_current {
            return;
        }
        if let Some(pending) = state.pending.take() {
            if let Err(e) = self.commit(session_id, pending.code).await {
                tracing::warn!(
                    "[CodeUpdatePipeline] Commit for session {} failed: {}",
                    session_id,
                    e
                );
            }
        }
    }

    async fn commit(&self, session_id: &str, code: String) -> Result<()> {
        let len = code.len();
        self.store
            .update(session_id, move |session| {
                session.current_code = code;
                Ok(())
            })
            .await?;
        tracing::debug!(
            "[CodeUpdatePipeline] Committed {} bytes for session {}",
            len,
            session_id
        );
        Ok(())
    }

    /// Commits the pending edit now, if there is one.
    ///
    /// Waits for a commit already in progress to finish first.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: a pending edit was committed
    /// - `Ok(false)`: nothing was pending
    pub async fn flush(&self, session_id: &str) -> Result<bool> {
        let slot = {
            let slots = self.slots.lock().await;
            match slots.get(session_id) {
                Some(slot) => Arc::clone(slot),
                None => return Ok(false),
            }
        };

        let mut state = slot.state.lock().await;
        let Some(pending) = state.pending.take() else {
            return Ok(false);
        };
        pending.cancel.cancel();
        self.commit(session_id, pending.code).await?;
        Ok(true)
    }

    /// Drops the session's slot, cancelling any pending edit without
    /// committing it. Call [`flush`](Self::flush) first to keep the edit.
    pub async fn forget(&self, session_id: &str) {
        let slot = self.slots.lock().await.remove(session_id);
        if let Some(slot) = slot {
            if let Some(pending) = slot.state.lock().await.pending.take() {
                pending.cancel.cancel();
            }
        }
    }

    pub async fn has_pending(&self, session_id: &str) -> bool {
        let slot = self.slots.lock().await.get(session_id).cloned();
        match slot {
            Some(slot) => slot.state.lock().await.pending.is_some(),
            None => false,
        }
    }
}
