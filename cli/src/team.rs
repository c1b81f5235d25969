//! Team assembly from configuration

use anyhow::{Context, Result};
use hypoloop_application::Participant;
use hypoloop_infrastructure::{FileConfig, LlmParticipant, OpenAiBackend, TokenSource};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Backends keyed by model name, shared by everything that uses the same model
pub struct BackendPool {
    config: FileConfig,
    source: Arc<dyn TokenSource>,
    backends: HashMap<String, Arc<OpenAiBackend>>,
}

impl BackendPool {
    pub fn new(config: &FileConfig) -> Result<Self> {
        let source = config
            .provider
            .token_source()
            .context("Failed to set up provider credentials")?;
        Ok(Self {
            config: config.clone(),
            source,
            backends: HashMap::new(),
        })
    }

    /// Backend for `model`, or for `[provider] model` when `None`
    pub fn backend(&mut self, model: Option<&str>) -> Result<Arc<OpenAiBackend>> {
        let model = model.unwrap_or(&self.config.provider.model).to_string();
        if let Some(backend) = self.backends.get(&model) {
            return Ok(backend.clone());
        }
        debug!("Creating backend for model {}", model);
        let backend = OpenAiBackend::new(
            self.config.provider.to_openai_config(Some(model.as_str())),
            self.source.clone(),
        )
        .with_context(|| format!("Failed to create backend for model {}", model))?;
        let backend = Arc::new(backend);
        self.backends.insert(model, backend.clone());
        Ok(backend)
    }

    /// One participant per `[[participants]]` entry
    pub fn participants(&mut self) -> Result<Vec<Arc<dyn Participant>>> {
        let entries = self.config.participants.clone();
        let mut participants: Vec<Arc<dyn Participant>> = Vec::with_capacity(entries.len());
        for entry in entries {
            let backend = self.backend(entry.model.as_deref())?;
            let mut participant = LlmParticipant::new(entry.name, entry.description, backend);
            if let Some(prompt) = entry.system_prompt {
                participant = participant.with_system_prompt(prompt);
            }
            participants.push(Arc::new(participant));
        }
        Ok(participants)
    }
}
