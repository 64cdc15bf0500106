//! Counts integrity signals per session and classifies their severity.

use crate::session_store::SessionStore;
use proctor_core::error::Result;
use proctor_core::proctoring::{ProctoringEvent, ProctoringKind, ProctoringRecord, severity_for};
use std::sync::Arc;

pub struct ProctoringAggregator {
    store: Arc<SessionStore>,
    final_warning_at: u64,
}

impl ProctoringAggregator {
    /// # Arguments
    ///
    /// * `final_warning_at` - Tab-switch count from which the severity is
    ///   `final_warning`
    pub fn new(store: Arc<SessionStore>, final_warning_at: u64) -> Self {
        Self {
            store,
            final_warning_at,
        }
    }

    /// Records one event: bumps the counter, appends the audit entry and
    /// returns the new count with its severity.
    ///
    /// Recorded in every session state, completed sessions included.
    /// Concurrent calls for one session are serialized by the store, so `k`
    /// reports always yield a count of exactly `k`.
    pub async fn record(
        &self,
        session_id: &str,
        kind: ProctoringKind,
        metadata: serde_json::Value,
    ) -> Result<ProctoringRecord> {
        let now = self.store.now();
        let final_at = self.final_warning_at;
        let record = self
            .store
            .update(session_id, move |session| {
                let count = session.proctoring_counters.increment(kind);
                session.proctoring_events.push(ProctoringEvent {
                    kind,
                    timestamp: now,
                    metadata,
                });
                Ok(ProctoringRecord {
                    kind,
                    count,
                    severity: severity_for(kind, count, final_at),
                })
            })
            .await?;

        tracing::info!(
            "[ProctoringAggregator] Session {}: {} #{} ({})",
            session_id,
            kind,
            record.count,
            record.severity
        );
        Ok(record)
    }

    pub async fn count(&self, session_id: &str, kind: ProctoringKind) -> Result<u64> {
        self.store
            .read(session_id, |s| s.proctoring_counters.get(kind))
            .await
    }
}
