//! Domain layer of the interview-session coordinator.
//!
//! Pure types and policies: no I/O lives here. Persistence and external
//! services are reached through the traits this crate defines.

pub mod clock;
pub mod config;
pub mod error;
pub mod execution;
pub mod problem;
pub mod proctoring;
pub mod session;

pub use error::{ProctorError, Result};
