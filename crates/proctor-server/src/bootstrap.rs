//! Composition root: picks implementations from the configuration and
//! wires the coordinator.

use anyhow::{Context, Result};
use proctor_application::{Collaborators, EventRouter};
use proctor_core::clock::SystemClock;
use proctor_core::config::{AppConfig, AssistantConfig, StorageConfig};
use proctor_core::problem::ProblemCatalog;
use proctor_core::session::SessionRepository;
use proctor_infrastructure::{FileSessionRepository, InMemorySessionRepository};
use proctor_interaction::{
    Assistant, ClientSideSpeech, Judge0Sandbox, OfflineAssistant, OpenAiApiAssistant,
};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantKind {
    OpenAi,
    Offline,
}

/// Without an API key the canned offline assistant answers.
pub fn assistant_kind(config: &AssistantConfig) -> AssistantKind {
    if config.api_key.trim().is_empty() {
        AssistantKind::Offline
    } else {
        AssistantKind::OpenAi
    }
}

fn build_assistant(config: &AssistantConfig) -> Result<Arc<dyn Assistant>> {
    match assistant_kind(config) {
        AssistantKind::OpenAi => {
            let assistant = OpenAiApiAssistant::from_config(config)
                .context("Failed to configure the assistant")?;
            tracing::info!("[Bootstrap] Assistant: {} at {}", assistant.model(), config.base_url);
            Ok(Arc::new(assistant))
        }
        AssistantKind::Offline => {
            tracing::warn!("[Bootstrap] No assistant API key configured, using offline replies");
            Ok(Arc::new(OfflineAssistant::new()))
        }
    }
}

async fn build_repository(config: &StorageConfig) -> Result<Arc<dyn SessionRepository>> {
    if !config.persist {
        tracing::info!("[Bootstrap] Persistence disabled, sessions live in memory only");
        return Ok(Arc::new(InMemorySessionRepository::new()));
    }
    let repository = match &config.sessions_dir {
        Some(dir) => FileSessionRepository::new(dir).await?,
        None => FileSessionRepository::default_location().await?,
    };
    tracing::info!(
        "[Bootstrap] Sessions stored in {}",
        repository.sessions_dir().display()
    );
    Ok(Arc::new(repository))
}

/// Builds the event router for `config`.
///
/// # Errors
///
/// Fails if the default problem is unknown, the sessions directory cannot
/// be created, or a collaborator cannot be configured.
pub async fn build(config: &AppConfig) -> Result<Arc<EventRouter>> {
    let catalog = ProblemCatalog::builtin();
    if catalog.get(&config.coordinator.default_problem_id).is_none() {
        anyhow::bail!(
            "Unknown default problem '{}' (available: {})",
            config.coordinator.default_problem_id,
            catalog.ids().collect::<Vec<_>>().join(", ")
        );
    }

    let sandbox =
        Judge0Sandbox::from_config(&config.sandbox).context("Failed to configure the sandbox")?;

    let collaborators = Collaborators {
        repository: build_repository(&config.storage).await?,
        catalog: Arc::new(catalog),
        clock: Arc::new(SystemClock),
        assistant: build_assistant(&config.assistant)?,
        sandbox: Arc::new(sandbox),
        speech: Arc::new(ClientSideSpeech),
    };

    Ok(EventRouter::new(
        &config.coordinator,
        config.speech.enabled,
        collaborators,
    ))
}
