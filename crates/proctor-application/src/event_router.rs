//! Single ingress and egress point of the coordinator.
//!
//! Each inbound frame is decoded into an [`InboundEvent`] and dispatched to
//! one handler. Handlers return `Result`; the router turns failures into the
//! matching outbound error event, so no component talks to connections
//! directly except through the registry.
//!
//! Ordering: replies to a connection travel over its single outbound
//! channel. `execution_started` is queued before the run task is spawned,
//! so the client always observes it before `execution_complete`.
//!
//! Membership: binding a connection to a session and releasing a session
//! whose last connection left both run under the membership lock, so a
//! rejoin never ends up bound to an evicted session.

use crate::chat_service::ChatService;
use crate::code_update_pipeline::CodeUpdatePipeline;
use crate::connection_registry::{ConnectionId, ConnectionRegistry, Departure, OutboundSender};
use crate::execution_coordinator::{ExecutionCoordinator, ExecutionPolicy};
use crate::idle_detector::{IdleDetector, IdlePolicy, speak_detached};
use crate::proctoring_aggregator::ProctoringAggregator;
use crate::protocol::{
    ChatMessagePayload, CodeUpdatePayload, Empty, InboundEvent, JoinSessionPayload,
    OutboundEvent, ProctoringEventPayload, RunCodePayload, SessionStatusPayload,
};
use crate::session_store::SessionStore;
use proctor_core::clock::Clock;
use proctor_core::config::CoordinatorConfig;
use proctor_core::error::{ProctorError, Result};
use proctor_core::problem::ProblemCatalog;
use proctor_core::session::{ChatMessage, SessionRepository, SessionStatus};
use proctor_interaction::{Assistant, CodeSandbox, SpeechSynthesizer};
use std::sync::Arc;
use tokio::sync::Mutex;

/// External collaborators and storage the coordinator is wired with.
pub struct Collaborators {
    pub repository: Arc<dyn SessionRepository>,
    pub catalog: Arc<ProblemCatalog>,
    pub clock: Arc<dyn Clock>,
    pub assistant: Arc<dyn Assistant>,
    pub sandbox: Arc<dyn CodeSandbox>,
    pub speech: Arc<dyn SpeechSynthesizer>,
}

pub struct EventRouter {
    registry: Arc<ConnectionRegistry>,
    store: Arc<SessionStore>,
    pipeline: Arc<CodeUpdatePipeline>,
    executions: Arc<ExecutionCoordinator>,
    chat: Arc<ChatService>,
    proctoring: Arc<ProctoringAggregator>,
    idle: Arc<IdleDetector>,
    speech: Arc<dyn SpeechSynthesizer>,
    voice_enabled: bool,
    membership: Mutex<()>,
}

impl EventRouter {
    /// Builds every component and wires them together.
    ///
    /// # Arguments
    ///
    /// * `config` - Timing and threshold parameters
    /// * `voice_enabled` - Whether assistant messages are spoken aloud
    /// * `collaborators` - Storage backend and external services
    pub fn new(
        config: &CoordinatorConfig,
        voice_enabled: bool,
        collaborators: Collaborators,
    ) -> Arc<Self> {
        let Collaborators {
            repository,
            catalog,
            clock,
            assistant,
            sandbox,
            speech,
        } = collaborators;

        let registry = Arc::new(ConnectionRegistry::new());
        let store = Arc::new(SessionStore::new(
            repository,
            catalog,
            Arc::clone(&clock),
            config.default_problem_id.clone(),
        ));
        let pipeline = Arc::new(CodeUpdatePipeline::new(
            Arc::clone(&store),
            config.quiet_window(),
        ));
        let executions = Arc::new(ExecutionCoordinator::new(
            Arc::clone(&store),
            sandbox,
            Arc::clone(&assistant),
            ExecutionPolicy {
                timeout: config.execution_timeout(),
                poll_interval: config.poll_interval(),
                initial_poll_delay: config.initial_poll_delay(),
                streak_threshold: config.streak_threshold,
            },
        ));
        let chat = Arc::new(ChatService::new(Arc::clone(&store), assistant));
        let proctoring = Arc::new(ProctoringAggregator::new(
            Arc::clone(&store),
            config.tab_switch_final_warning_at,
        ));
        let idle = Arc::new(IdleDetector::new(
            Arc::clone(&store),
            registry.clone(),
            Arc::clone(&speech),
            clock,
            IdlePolicy {
                check_interval: config.idle_check_interval(),
                threshold: config.idle_threshold(),
                min_code_length: config.min_code_length,
            },
            voice_enabled,
        ));

        Arc::new(Self {
            registry,
            store,
            pipeline,
            executions,
            chat,
            proctoring,
            idle,
            speech,
            voice_enabled,
            membership: Mutex::new(()),
        })
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn pipeline(&self) -> &Arc<CodeUpdatePipeline> {
        &self.pipeline
    }

    pub fn idle_detector(&self) -> &Arc<IdleDetector> {
        &self.idle
    }

    pub fn executions(&self) -> &Arc<ExecutionCoordinator> {
        &self.executions
    }

    /// Registers a transport connection whose outbound events go to `sender`.
    pub async fn connect(&self, sender: OutboundSender) -> ConnectionId {
        self.registry.connect(sender).await
    }

    /// Handles one inbound text frame.
    ///
    /// Never fails: every error is reported to the client as an event.
    pub async fn handle_text(self: &Arc<Self>, conn_id: ConnectionId, text: &str) {
        let event = match InboundEvent::parse(text) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!("[EventRouter] Rejected frame from {}: {}", conn_id, e);
                self.registry
                    .send_to(conn_id, OutboundEvent::error(&e))
                    .await;
                return;
            }
        };
        self.dispatch(conn_id, event).await;
    }

    /// Routes one decoded event to its handler.
    pub async fn dispatch(self: &Arc<Self>, conn_id: ConnectionId, event: InboundEvent) {
        let name = event.name();
        tracing::debug!("[EventRouter] {} from {}", name, conn_id);

        if let InboundEvent::JoinSession(payload) = event {
            if let Err(e) = self.on_join(conn_id, payload).await {
                self.report(conn_id, None, &e, OutboundEvent::error).await;
            }
            return;
        }

        let Some(session_id) = self.registry.session_of(conn_id).await else {
            let e = ProctorError::validation(format!("'{}' requires a joined session", name));
            self.report(conn_id, None, &e, OutboundEvent::error).await;
            return;
        };

        match event {
            InboundEvent::JoinSession(_) => {}
            InboundEvent::CodeUpdate(payload) => {
                if let Err(e) = self.on_code_update(&session_id, payload).await {
                    self.report(conn_id, Some(&session_id), &e, OutboundEvent::error)
                        .await;
                }
            }
            InboundEvent::RunCode(payload) => {
                self.on_run_code(conn_id, &session_id, payload).await;
            }
            InboundEvent::ChatMessage(payload) => {
                self.on_chat_message(conn_id, &session_id, payload).await;
            }
            InboundEvent::ProctoringEvent(payload) => {
                if let Err(e) = self.on_proctoring_event(conn_id, &session_id, payload).await {
                    self.report(conn_id, Some(&session_id), &e, OutboundEvent::error)
                        .await;
                }
            }
            InboundEvent::StartSession => {
                let now = self.store.now();
                let result = self
                    .store
                    .update(&session_id, |session| session.start(now))
                    .await;
                self.finish_transition(conn_id, &session_id, result).await;
            }
            InboundEvent::EndSession => {
                let result = self.on_end_session(&session_id).await;
                self.finish_transition(conn_id, &session_id, result).await;
            }
        }
    }

    async fn on_join(&self, conn_id: ConnectionId, payload: JoinSessionPayload) -> Result<()> {
        let session_id = payload.session_id.trim().to_string();
        let (joined, departure) = {
            let _membership = self.membership.lock().await;
            // Commit a pending edit so the snapshot carries the latest code.
            if self.store.contains(&session_id).await {
                self.pipeline.flush(&session_id).await?;
            }

            let joined = self
                .store
                .get_or_create(&session_id, payload.candidate_name.as_deref())
                .await?;
            let departure = self.registry.bind(conn_id, &session_id).await;
            self.idle.watch(&session_id).await;
            (joined, departure)
        };

        if let Some(departure) = departure {
            self.on_departure(departure).await;
        }

        tracing::info!(
            "[EventRouter] Connection {} joined session {} ({})",
            conn_id,
            session_id,
            if joined.created { "new" } else { "existing" }
        );
        self.registry
            .send_to(conn_id, OutboundEvent::SessionJoined(joined.snapshot))
            .await;
        Ok(())
    }

    async fn on_code_update(
        self: &Arc<Self>,
        session_id: &str,
        payload: CodeUpdatePayload,
    ) -> Result<()> {
        self.ensure_open(session_id).await?;
        self.pipeline.on_code_edit(session_id, payload.code).await
    }

    async fn on_run_code(
        self: &Arc<Self>,
        conn_id: ConnectionId,
        session_id: &str,
        payload: RunCodePayload,
    ) {
        let permit = match self.executions.begin(session_id).await {
            Ok(permit) => permit,
            Err(e) => {
                self.report(conn_id, Some(session_id), &e, OutboundEvent::execution_error)
                    .await;
                return;
            }
        };

        // Without explicit code the run uses the committed code, which must
        // include the latest edit.
        if payload.code.is_none() {
            if let Err(e) = self.pipeline.flush(session_id).await {
                self.report(conn_id, Some(session_id), &e, OutboundEvent::execution_error)
                    .await;
                return;
            }
        }

        self.registry
            .send_to(conn_id, OutboundEvent::ExecutionStarted(Empty {}))
            .await;

        let router = Arc::clone(self);
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            match router.executions.run(permit, payload.code).await {
                Ok(outcome) => {
                    router
                        .registry
                        .send_to(conn_id, OutboundEvent::ExecutionComplete(outcome.result))
                        .await;
                    if let Some(hint) = outcome.hint {
                        router.deliver_assistant_message(&session_id, hint).await;
                    }
                }
                Err(e) => {
                    router
                        .report(conn_id, Some(&session_id), &e, OutboundEvent::execution_error)
                        .await;
                }
            }
        });
    }

    async fn on_chat_message(
        self: &Arc<Self>,
        conn_id: ConnectionId,
        session_id: &str,
        payload: ChatMessagePayload,
    ) {
        // Taken before spawning so a release that races the task still
        // cancels it.
        let cancel = self.chat.cancel_token(session_id).await;
        let router = Arc::clone(self);
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            match router
                .chat
                .send_until(&session_id, &payload.message, &cancel)
                .await
            {
                Ok(reply) => router.deliver_assistant_message(&session_id, reply).await,
                Err(e) if e.is_cancelled() => {
                    tracing::debug!("[EventRouter] {}", e);
                }
                Err(e) => {
                    router
                        .report(conn_id, Some(&session_id), &e, OutboundEvent::chat_error)
                        .await;
                }
            }
        });
    }

    async fn on_proctoring_event(
        &self,
        conn_id: ConnectionId,
        session_id: &str,
        payload: ProctoringEventPayload,
    ) -> Result<()> {
        let record = self
            .proctoring
            .record(session_id, payload.kind, payload.metadata)
            .await?;
        self.registry
            .send_to(conn_id, OutboundEvent::ProctoringAck(record.into()))
            .await;
        Ok(())
    }

    async fn on_end_session(&self, session_id: &str) -> Result<()> {
        self.pipeline.flush(session_id).await?;
        let now = self.store.now();
        self.store
            .update(session_id, |session| session.complete(now))
            .await?;
        self.chat.cancel(session_id).await;
        self.pipeline.forget(session_id).await;
        self.idle.unwatch(session_id).await;
        Ok(())
    }

    /// Broadcasts the new status after a lifecycle transition.
    async fn finish_transition(
        &self,
        conn_id: ConnectionId,
        session_id: &str,
        result: Result<()>,
    ) {
        match result {
            Ok(_) => {
                let status = self.store.read(session_id, |s| s.status).await;
                if let Ok(status) = status {
                    tracing::info!("[EventRouter] Session {} is now {}", session_id, status);
                    self.registry
                        .broadcast(
                            session_id,
                            OutboundEvent::SessionStatus(SessionStatusPayload { status }),
                        )
                        .await;
                }
            }
            Err(e) => {
                self.report(conn_id, Some(session_id), &e, OutboundEvent::error)
                    .await;
            }
        }
    }

    async fn ensure_open(&self, session_id: &str) -> Result<()> {
        let status = self.store.read(session_id, |s| s.status).await?;
        if status == SessionStatus::Completed {
            return Err(ProctorError::validation(format!(
                "Session {} is completed",
                session_id
            )));
        }
        Ok(())
    }

    /// Sends an assistant message to every connection of the session and
    /// speaks it when voice mode is on.
    async fn deliver_assistant_message(&self, session_id: &str, message: ChatMessage) {
        if self.voice_enabled {
            speak_detached(&self.speech, session_id, &message.content);
        }
        self.registry
            .broadcast(
                session_id,
                OutboundEvent::chat_response(message, self.voice_enabled),
            )
            .await;
    }

    /// Reports a failure to the originating connection with `to_event`.
    /// Fatal failures are additionally broadcast to the whole session.
    async fn report(
        &self,
        conn_id: ConnectionId,
        session_id: Option<&str>,
        error: &ProctorError,
        to_event: fn(&ProctorError) -> OutboundEvent,
    ) {
        match session_id {
            Some(session_id) if error.is_fatal() => {
                tracing::error!("[EventRouter] Session {}: {}", session_id, error);
                self.registry
                    .broadcast(session_id, OutboundEvent::error(error))
                    .await;
            }
            _ if error.is_validation() || error.is_not_found() => {
                tracing::debug!("[EventRouter] Rejected request from {}: {}", conn_id, error);
            }
            _ => {
                tracing::warn!("[EventRouter] Request from {} failed: {}", conn_id, error);
            }
        }
        self.registry.send_to(conn_id, to_event(error)).await;
    }

    /// Transport closed.
    pub async fn disconnect(&self, conn_id: ConnectionId) {
        if let Some(departure) = self.registry.disconnect(conn_id).await {
            self.on_departure(departure).await;
        }
    }

    /// Releases per-session resources once the last connection is gone.
    ///
    /// Pending chat work is abandoned and the pending edit is committed. An
    /// execution still in flight finishes on its own; its result is
    /// discarded with the session.
    async fn on_departure(&self, departure: Departure) {
        if !departure.was_last {
            return;
        }
        let session_id = departure.session_id;
        let _membership = self.membership.lock().await;
        if self.registry.connection_count(&session_id).await > 0 {
            tracing::debug!(
                "[EventRouter] Session {} was rejoined, keeping it live",
                session_id
            );
            return;
        }

        self.chat.cancel(&session_id).await;
        if let Err(e) = self.pipeline.flush(&session_id).await {
            tracing::warn!(
                "[EventRouter] Final commit for session {} failed: {}",
                session_id,
                e
            );
        }
        self.pipeline.forget(&session_id).await;
        self.idle.unwatch(&session_id).await;
        self.store.evict(&session_id).await;
        tracing::info!("[EventRouter] Released session {}", session_id);
    }
}
