//! Unified path management for proctor files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/proctor/            # Config directory
//! ├── config.toml               # Application configuration
//! ├── sessions/                 # One JSON document per interview session
//! │   └── <session_id>.json
//! └── logs/                     # Application logs
//!     └── proctor-server.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;
use thiserror::Error;

const APP_DIR: &str = "proctor";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    /// Platform config directory could not be determined.
    #[error("Cannot find config directory")]
    ConfigDirNotFound,
}

/// Path resolution for proctor.
pub struct ProctorPaths;

impl ProctorPaths {
    /// Returns the proctor configuration directory (e.g. `~/.config/proctor/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the directory holding persisted sessions.
    pub fn sessions_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("sessions"))
    }

    /// Returns the path to the logs directory.
    pub fn logs_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("logs"))
    }
}
