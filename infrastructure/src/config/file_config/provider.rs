//! Model provider configuration from TOML (`[provider]` section)

use crate::credentials::{ApiKey, CliTokenSource, CredentialError, TokenSource};
use crate::providers::{OPENAI_BASE_URL, OpenAiConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// How the backend authenticates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAuthMethod {
    /// Static API key from `api_key` or the `api_key_env` variable
    #[default]
    ApiKey,
    /// Short-lived tokens printed by `token_command`
    Command,
}

/// OpenAI-compatible endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    pub base_url: String,
    /// Default model for the orchestrator and participants
    pub model: String,
    /// `api-version` query parameter (Azure OpenAI)
    pub api_version: Option<String>,
    pub auth: FileAuthMethod,
    /// Environment variable holding the API key (default: "OPENAI_API_KEY")
    pub api_key_env: String,
    /// Direct API key (not recommended; use `api_key_env`)
    pub api_key: Option<String>,
    /// Command printing a JSON access token, run with `--scope <token_scope>`
    pub token_command: Vec<String>,
    pub token_scope: String,
    /// Whether the model accepts images
    pub vision: bool,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_seconds: u64,
}

impl Default for FileProviderConfig {
    fn default() -> Self {
        Self {
            base_url: OPENAI_BASE_URL.to_string(),
            model: "gpt-4o".to_string(),
            api_version: None,
            auth: FileAuthMethod::ApiKey,
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            token_command: ["az", "account", "get-access-token", "--output", "json"]
                .map(String::from)
                .to_vec(),
            token_scope: "https://cognitiveservices.azure.com/.default".to_string(),
            vision: false,
            temperature: None,
            max_tokens: None,
            timeout_seconds: 120,
        }
    }
}

impl FileProviderConfig {
    /// Backend settings for `model`, or the provider default when `None`
    pub fn to_openai_config(&self, model: Option<&str>) -> OpenAiConfig {
        let mut config = OpenAiConfig::new(model.unwrap_or(&self.model));
        config.base_url = self.base_url.clone();
        config.api_version = self.api_version.clone();
        config.token_scope = self.token_scope.clone();
        config.vision = self.vision;
        config.temperature = self.temperature;
        config.max_tokens = self.max_tokens;
        config.timeout = Duration::from_secs(self.timeout_seconds);
        config
    }

    /// The credential source selected by `auth`
    pub fn token_source(&self) -> Result<Arc<dyn TokenSource>, CredentialError> {
        match self.auth {
            FileAuthMethod::ApiKey => {
                let key = match &self.api_key {
                    Some(key) => ApiKey::new(key.clone()),
                    None => ApiKey::from_env(&self.api_key_env)?,
                };
                Ok(Arc::new(key))
            }
            FileAuthMethod::Command => CliTokenSource::from_command(&self.token_command)
                .map(|source| Arc::new(source) as Arc<dyn TokenSource>)
                .ok_or_else(|| CredentialError::CommandFailed {
                    command: String::new(),
                    message: "token_command is empty".to_string(),
                }),
        }
    }
}
