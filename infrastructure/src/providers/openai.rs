//! OpenAI-compatible chat completions backend
//!
//! Works against any endpoint speaking the `/chat/completions` protocol,
//! including Azure OpenAI deployments (set `api_version`). Bearer tokens come
//! from a [`CredentialCache`], so short-lived tokens are refreshed before
//! they expire.

use crate::credentials::{CredentialCache, CredentialError, TokenSource};
use async_trait::async_trait;
use hypoloop_application::ports::model_backend::{BackendError, ModelBackend, ModelCapabilities};
use hypoloop_domain::{ContentPart, LlmMessage, MessageContent};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Default OpenAI API endpoint
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Could not build HTTP client: {0}")]
    Client(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Response contained no message content")]
    EmptyResponse,
}

impl From<ProviderError> for BackendError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Credential(e) => BackendError::AuthenticationFailed(e.to_string()),
            ProviderError::Status { status, body } => match status {
                401 | 403 => BackendError::AuthenticationFailed(body),
                408 => BackendError::Timeout,
                _ => BackendError::RequestFailed(format!("{status}: {body}")),
            },
            ProviderError::Http(e) if e.is_timeout() => BackendError::Timeout,
            ProviderError::Http(e) => BackendError::ConnectionError(e.to_string()),
            ProviderError::Parse(_) | ProviderError::EmptyResponse => {
                BackendError::InvalidResponse(e.to_string())
            }
            ProviderError::Client(message) => BackendError::Other(message),
        }
    }
}

/// Connection settings for an OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub model: String,
    /// Sent as the `api-version` query parameter when set (Azure OpenAI)
    pub api_version: Option<String>,
    /// Scope requested from the token source
    pub token_scope: String,
    pub vision: bool,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: OPENAI_BASE_URL.to_string(),
            model: model.into(),
            api_version: None,
            token_scope: String::new(),
            vision: false,
            temperature: None,
            max_tokens: None,
            timeout: Duration::from_secs(120),
        }
    }

    fn completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match &self.api_version {
            Some(version) => format!("{base}/chat/completions?api-version={version}"),
            None => format!("{base}/chat/completions"),
        }
    }
}

pub struct OpenAiBackend {
    config: OpenAiConfig,
    client: reqwest::Client,
    credentials: CredentialCache,
}

impl OpenAiBackend {
    pub fn new(config: OpenAiConfig, source: Arc<dyn TokenSource>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;
        Ok(Self {
            config,
            client,
            credentials: CredentialCache::new(source),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Build the request body for the API
    fn build_request_body(&self, messages: &[LlmMessage]) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": messages.iter().map(message_to_openai).collect::<Vec<_>>(),
        });
        if let Some(temperature) = self.config.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }

    async fn send(&self, messages: &[LlmMessage]) -> Result<String, ProviderError> {
        let token = self.credentials.token(&self.config.token_scope).await?;
        let body = self.build_request_body(messages);
        debug!(
            "POST {} ({} messages, model {})",
            self.config.completions_url(),
            messages.len(),
            self.config.model
        );

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body_text = response.text().await?;
        if !(200..300).contains(&status) {
            if status == 401 {
                warn!("Credential rejected, dropping cached token");
                self.credentials.invalidate(&self.config.token_scope).await;
            }
            return Err(ProviderError::Status {
                status,
                body: body_text,
            });
        }

        parse_response(&body_text)
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    async fn complete(&self, messages: &[LlmMessage]) -> Result<String, BackendError> {
        Ok(self.send(messages).await?)
    }

    fn capabilities(&self) -> ModelCapabilities {
        if self.config.vision {
            ModelCapabilities::with_vision()
        } else {
            ModelCapabilities::text_only()
        }
    }
}

/// Convert a message to the OpenAI wire format
fn message_to_openai(message: &LlmMessage) -> Value {
    let content = match &message.content {
        MessageContent::Text(text) => json!(text),
        MessageContent::Parts(parts) => Value::Array(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => json!({"type": "text", "text": text}),
                    ContentPart::Image { image } => json!({
                        "type": "image_url",
                        "image_url": {
                            "url": format!("data:{};base64,{}", image.media_type, image.data)
                        }
                    }),
                })
                .collect(),
        ),
    };

    let mut value = json!({
        "role": message.role.as_str(),
        "content": content,
    });
    if let Some(name) = message.source.as_deref().and_then(wire_name) {
        value["name"] = json!(name);
    }
    value
}

/// The API only accepts `[A-Za-z0-9_-]` in message names
fn wire_name(source: &str) -> Option<String> {
    let name: String = source
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .take(64)
        .collect();
    (!name.trim_matches('_').is_empty()).then_some(name)
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn parse_response(body: &str) -> Result<String, ProviderError> {
    let completion: ChatCompletion =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|content| !content.is_empty())
        .ok_or(ProviderError::EmptyResponse)
}
