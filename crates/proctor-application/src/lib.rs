//! Application layer: the interview-session coordinator.
//!
//! Components, each owning one concern:
//!
//! - [`SessionStore`]: live sessions, single writer per session, persistence
//! - [`ConnectionRegistry`]: transport connections and their sessions
//! - [`CodeUpdatePipeline`]: debounced commits of editor contents
//! - [`IdleDetector`]: periodic nudges for idle candidates
//! - [`ExecutionCoordinator`]: sandbox runs and the repeated-failure hint
//! - [`ProctoringAggregator`]: integrity signal counters
//! - [`ChatService`]: candidate/assistant conversation
//! - [`EventRouter`]: decodes client frames and dispatches them

pub mod chat_service;
pub mod code_update_pipeline;
pub mod connection_registry;
pub mod event_router;
pub mod execution_coordinator;
pub mod idle_detector;
pub mod proctoring_aggregator;
pub mod protocol;
pub mod session_store;

pub use chat_service::ChatService;
pub use code_update_pipeline::CodeUpdatePipeline;
pub use connection_registry::{ConnectionId, ConnectionRegistry, EventSink, OutboundSender};
pub use event_router::{Collaborators, EventRouter};
pub use execution_coordinator::{ExecutionCoordinator, ExecutionPolicy, RunOutcome, RunPermit};
pub use idle_detector::{IdleDetector, IdlePolicy};
pub use proctoring_aggregator::ProctoringAggregator;
pub use protocol::{InboundEvent, OutboundEvent};
pub use session_store::{JoinOutcome, SessionStore};
