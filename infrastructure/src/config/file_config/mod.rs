//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.

mod logging;
mod orchestrator;
mod participants;
mod provider;

pub use logging::FileLoggingConfig;
pub use orchestrator::FileOrchestratorConfig;
pub use participants::FileParticipantConfig;
pub use provider::{FileAuthMethod, FileProviderConfig};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// A problem found by [`FileConfig::validate`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("[orchestrator] max_stalls must be at least 1")]
    ZeroStalls,

    #[error("[orchestrator] max_structured_retries must be at least 1")]
    ZeroRetries,

    #[error("[orchestrator] name cannot be empty")]
    EmptyOrchestratorName,

    #[error("[orchestrator] final_answer_prompt does not mention {{question}}")]
    PromptWithoutQuestion,

    #[error("[provider] model cannot be empty")]
    EmptyModelName,

    #[error("[provider] base_url must start with http:// or https://, got '{0}'")]
    InvalidBaseUrl(String),

    #[error("[provider] timeout_seconds cannot be 0")]
    InvalidTimeout,

    #[error("no [[participants]] configured")]
    NoParticipants,

    #[error("participant name cannot be empty")]
    EmptyParticipantName,

    #[error("participant '{0}' is configured more than once")]
    DuplicateParticipant(String),

    #[error("participant '{0}' has the orchestrator's name")]
    ParticipantNamedLikeOrchestrator(String),

    #[error("participant '{0}' has no description; the orchestrator cannot plan around it")]
    MissingDescription(String),
}

impl ConfigValidationError {
    /// Fatal problems stop the run; the rest are warnings.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ConfigValidationError::PromptWithoutQuestion
                | ConfigValidationError::MissingDescription(_)
        )
    }
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub orchestrator: FileOrchestratorConfig,
    pub provider: FileProviderConfig,
    pub participants: Vec<FileParticipantConfig>,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();

        let orchestrator = &self.orchestrator;
        if orchestrator.max_stalls == 0 {
            issues.push(ConfigValidationError::ZeroStalls);
        }
        if orchestrator.max_structured_retries == 0 {
            issues.push(ConfigValidationError::ZeroRetries);
        }
        if orchestrator.name.trim().is_empty() {
            issues.push(ConfigValidationError::EmptyOrchestratorName);
        }
        if let Some(prompt) = &orchestrator.final_answer_prompt
            && !prompt.contains("{question}")
        {
            issues.push(ConfigValidationError::PromptWithoutQuestion);
        }

        let provider = &self.provider;
        let models = std::iter::once(Some(provider.model.as_str()))
            .chain(std::iter::once(orchestrator.model.as_deref()))
            .chain(self.participants.iter().map(|p| p.model.as_deref()))
            .flatten();
        for model in models {
            if model.trim().is_empty() {
                issues.push(ConfigValidationError::EmptyModelName);
                break;
            }
        }
        if !provider.base_url.starts_with("http://") && !provider.base_url.starts_with("https://")
        {
            issues.push(ConfigValidationError::InvalidBaseUrl(provider.base_url.clone()));
        }
        if provider.timeout_seconds == 0 {
            issues.push(ConfigValidationError::InvalidTimeout);
        }

        if self.participants.is_empty() {
            issues.push(ConfigValidationError::NoParticipants);
        }
        let mut names = HashSet::new();
        for participant in &self.participants {
            let name = participant.name.trim();
            if name.is_empty() {
                issues.push(ConfigValidationError::EmptyParticipantName);
                continue;
            }
            if !names.insert(name) {
                issues.push(ConfigValidationError::DuplicateParticipant(name.to_string()));
            }
            if name == orchestrator.name.trim() {
                issues.push(ConfigValidationError::ParticipantNamedLikeOrchestrator(
                    name.to_string(),
                ));
            }
            if participant.description.trim().is_empty() {
                issues.push(ConfigValidationError::MissingDescription(name.to_string()));
            }
        }

        issues
    }
}
