//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: The interview record (`InterviewSession`) and its join snapshot
//! - `message`: Transcript types (`MessageRole`, `ChatMessage`)
//! - `repository`: Repository trait for session persistence

mod message;
mod model;
mod repository;

pub use message::{ChatMessage, MessageRole};
pub use model::{
    InterviewSession, MAX_SESSION_ID_LEN, SessionSnapshot, SessionStatus, validate_session_id,
};
pub use repository::SessionRepository;
