//! Model backend port
//!
//! Defines the interface for requesting completions from a language model.

use async_trait::async_trait;
use hypoloop_domain::LlmMessage;
use thiserror::Error;

/// Errors that can occur during a completion request
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

/// What the model behind a backend can accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelCapabilities {
    /// Whether image content can be sent
    pub vision: bool,
}

impl ModelCapabilities {
    pub fn text_only() -> Self {
        Self { vision: false }
    }

    pub fn with_vision() -> Self {
        Self { vision: true }
    }
}

/// Backend for chat completions
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Complete a conversation, returning the model's text reply
    async fn complete(&self, messages: &[LlmMessage]) -> Result<String, BackendError>;

    /// Capabilities of the underlying model
    fn capabilities(&self) -> ModelCapabilities;
}
