//! Infrastructure layer: persistence, paths and configuration loading.

pub mod config_service;
pub mod file_session_repository;
pub mod memory_session_repository;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::file_session_repository::FileSessionRepository;
pub use crate::memory_session_repository::InMemorySessionRepository;
pub use crate::paths::ProctorPaths;
