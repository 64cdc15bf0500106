//! Configuration model.
//!
//! Every section is fully defaulted so a partial (or missing) `config.toml`
//! still yields a usable configuration. Loading and environment overrides
//! live in the infrastructure layer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root of the configuration file.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub coordinator: CoordinatorConfig,
    pub assistant: AssistantConfig,
    pub sandbox: SandboxConfig,
    pub speech: SpeechConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Parses a TOML document, filling every missing field with its default.
    pub fn from_toml_str(content: &str) -> crate::error::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Product parameters of the session coordinator.
///
/// All durations are stored in milliseconds to keep the TOML file readable;
/// use the accessor methods to get `Duration`s.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Quiet period after the last edit before `current_code` is committed.
    pub quiet_window_ms: u64,
    /// Period of the idle detector's scan.
    pub idle_check_interval_ms: u64,
    /// Idle time after which a proactive nudge may be sent.
    pub idle_threshold_ms: u64,
    /// Minimum code length (in characters) before nudging makes sense.
    pub min_code_length: usize,
    /// Identical consecutive failures before an escalation hint.
    pub streak_threshold: u32,
    /// Tab switch count at which the severity becomes a final warning.
    pub tab_switch_final_warning_at: u64,
    /// Upper bound on a whole sandbox run, submission plus polling.
    pub execution_timeout_ms: u64,
    /// Longest delay between two polls of the sandbox.
    pub poll_interval_ms: u64,
    /// Delay before the first poll; doubles up to `poll_interval_ms`.
    pub initial_poll_delay_ms: u64,
    /// Problem assigned to newly created sessions.
    pub default_problem_id: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            quiet_window_ms: 3_000,
            idle_check_interval_ms: 10_000,
            idle_threshold_ms: 120_000,
            min_code_length: 50,
            streak_threshold: 3,
            tab_switch_final_warning_at: 3,
            execution_timeout_ms: 30_000,
            poll_interval_ms: 1_000,
            initial_poll_delay_ms: 250,
            default_problem_id: "two-sum".to_string(),
        }
    }
}

impl CoordinatorConfig {
    pub fn quiet_window(&self) -> Duration {
        Duration::from_millis(self.quiet_window_ms)
    }

    pub fn idle_check_interval(&self) -> Duration {
        Duration::from_millis(self.idle_check_interval_ms)
    }

    pub fn idle_threshold(&self) -> Duration {
        Duration::from_millis(self.idle_threshold_ms)
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn initial_poll_delay(&self) -> Duration {
        Duration::from_millis(self.initial_poll_delay_ms)
    }
}

/// OpenAI-compatible chat completions endpoint used by the interviewer.
///
/// An empty `api_key` selects the offline assistant.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AssistantConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

/// Judge0 code execution endpoint.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SandboxConfig {
    pub endpoint: String,
    /// RapidAPI key; when empty the endpoint is assumed to be self-hosted.
    pub api_key: String,
    /// Judge0 language id (63 = JavaScript, Node.js).
    pub language_id: u32,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://judge0-ce.p.rapidapi.com".to_string(),
            api_key: String::new(),
            language_id: 63,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    /// Voice mode: assistant messages are also handed to text-to-speech.
    pub enabled: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Persist sessions to disk. When false sessions live in memory only.
    pub persist: bool,
    /// Overrides the default `<config_dir>/proctor/sessions` directory.
    pub sessions_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            persist: true,
            sessions_dir: None,
        }
    }
}
