//! Configuration loading.
//!
//! The configuration is read from `~/.config/proctor/config.toml` (or the
//! file named by `PROCTOR_CONFIG`), then selected fields are overridden from
//! the environment. A missing file yields the defaults.

use crate::paths::ProctorPaths;
use proctor_core::config::AppConfig;
use proctor_core::error::{ProctorError, Result};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "PROCTOR_CONFIG";

/// Loads `AppConfig` from file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigService {
    path: Option<PathBuf>,
}

impl ConfigService {
    /// Uses `PROCTOR_CONFIG` if set, otherwise the default config file.
    pub fn new() -> Self {
        Self {
            path: std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from),
        }
    }

    /// Reads from an explicit file instead.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Loads the configuration with process environment overrides applied.
    ///
    /// # Errors
    ///
    /// Returns `ProctorError::Config` if the file exists but cannot be read
    /// or parsed, or if an override has an invalid value.
    pub fn load(&self) -> Result<AppConfig> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Like [`load`](Self::load) with an injectable environment lookup.
    pub fn load_with_env<F>(&self, lookup: F) -> Result<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => ProctorPaths::config_file().map_err(|e| ProctorError::config(e.to_string()))?,
        };

        let mut config = Self::load_file(&path)?;
        apply_env_overrides(&mut config, lookup)?;
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            tracing::info!(
                "[ConfigService] No config at {}, using defaults",
                path.display()
            );
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ProctorError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = AppConfig::from_toml_str(&content).map_err(|e| {
            ProctorError::config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        tracing::info!("[ConfigService] Loaded config from {}", path.display());
        Ok(config)
    }
}

/// Applies the supported environment overrides to `config`.
///
/// Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(host) = get("PROCTOR_HOST") {
        config.server.host = host;
    }
    if let Some(port) = get("PROCTOR_PORT") {
        config.server.port = port
            .trim()
            .parse()
            .map_err(|_| ProctorError::config(format!("PROCTOR_PORT is not a port: {}", port)))?;
    }
    if let Some(api_key) = get("OPENAI_API_KEY") {
        config.assistant.api_key = api_key;
    }
    if let Some(base_url) = get("OPENAI_BASE_URL") {
        config.assistant.base_url = base_url;
    }
    if let Some(model) = get("OPENAI_MODEL_NAME") {
        config.assistant.model = model;
    }
    if let Some(endpoint) = get("JUDGE0_ENDPOINT") {
        config.sandbox.endpoint = endpoint;
    }
    if let Some(api_key) = get("JUDGE0_API_KEY") {
        config.sandbox.api_key = api_key;
    }
    Ok(())
}
