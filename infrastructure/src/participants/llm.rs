//! Model-backed participant
//!
//! Answers through a [`ModelBackend`] with its own system prompt. Keeps the
//! conversation it has seen since the last reset, so each request carries
//! the full context the participant was shown.

use async_trait::async_trait;
use hypoloop_application::ports::model_backend::ModelBackend;
use hypoloop_application::ports::participant::{Participant, ParticipantError};
use hypoloop_domain::{ChatMessage, LlmMessage, strip_images};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

pub struct LlmParticipant {
    name: String,
    description: String,
    system_prompt: String,
    backend: Arc<dyn ModelBackend>,
    history: Mutex<Vec<LlmMessage>>,
}

impl LlmParticipant {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        backend: Arc<dyn ModelBackend>,
    ) -> Self {
        let name = name.into();
        let description = description.into();
        let system_prompt = format!("You are {name}. {description}");
        Self {
            name,
            description,
            system_prompt,
            backend,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    fn to_llm(&self, message: &ChatMessage) -> LlmMessage {
        if message.source == self.name {
            LlmMessage::assistant(message.source.clone(), message.content.clone())
        } else {
            LlmMessage::user(message.source.clone(), message.content.clone())
        }
    }
}

#[async_trait]
impl Participant for LlmParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn respond(&self, messages: &[ChatMessage]) -> Result<ChatMessage, ParticipantError> {
        let mut history = self.history.lock().await;
        history.extend(messages.iter().map(|m| self.to_llm(m)));

        let mut request = Vec::with_capacity(history.len() + 1);
        request.push(LlmMessage::system(self.system_prompt.clone()));
        request.extend(history.iter().cloned());
        if !self.backend.capabilities().vision {
            request = strip_images(&request);
        }

        debug!("{} answering with {} messages of context", self.name, request.len());
        let reply = self
            .backend
            .complete(&request)
            .await
            .map_err(|e| ParticipantError::ModelFailed(e.to_string()))?;

        history.push(LlmMessage::assistant(self.name.clone(), reply.clone()));
        Ok(ChatMessage::text(self.name.clone(), reply))
    }

    async fn reset(&self) {
        self.history.lock().await.clear();
    }
}
