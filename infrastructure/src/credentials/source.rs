//! Token sources

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("API key not set: {0}")]
    MissingApiKey(String),

    #[error("Token command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Invalid token response: {0}")]
    InvalidToken(String),
}

/// A bearer token and when it stops being valid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    /// `None` for credentials that never expire, such as API keys
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Whether the token is still usable at `now`, keeping `margin` in reserve
    pub fn is_fresh(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - margin > now,
            None => true,
        }
    }
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch(&self, scope: &str) -> Result<AccessToken, CredentialError>;
}

/// A fixed API key, valid for every scope
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Read the key from an environment variable
    pub fn from_env(var: &str) -> Result<Self, CredentialError> {
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Self(key)),
            _ => Err(CredentialError::MissingApiKey(var.to_string())),
        }
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[async_trait]
impl TokenSource for ApiKey {
    async fn fetch(&self, _scope: &str) -> Result<AccessToken, CredentialError> {
        Ok(AccessToken::new(self.0.clone(), None))
    }
}

/// Fetches tokens by running a CLI that prints a JSON token document,
/// e.g. `az account get-access-token --output json`.
///
/// The scope is passed as `--scope <scope>`.
#[derive(Debug, Clone)]
pub struct CliTokenSource {
    program: String,
    args: Vec<String>,
}

/// Token document printed by the CLI; accepts both epoch and RFC 3339 expiry
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    #[serde(default, rename = "expires_on")]
    expires_on: Option<i64>,
    #[serde(default)]
    expires_on_rfc3339: Option<String>,
}

impl CliTokenSource {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a command line split into words; `None` when empty
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub(crate) fn parse(output: &str) -> Result<AccessToken, CredentialError> {
        let token: CliToken = serde_json::from_str(output)
            .map_err(|e| CredentialError::InvalidToken(e.to_string()))?;
        if token.access_token.is_empty() {
            return Err(CredentialError::InvalidToken(
                "empty accessToken".to_string(),
            ));
        }

        let expires_at = match (token.expires_on, token.expires_on_rfc3339) {
            (Some(secs), _) => Some(DateTime::from_timestamp(secs, 0).ok_or_else(|| {
                CredentialError::InvalidToken(format!("expires_on out of range: {secs}"))
            })?),
            (None, Some(text)) => Some(
                DateTime::parse_from_rfc3339(&text)
                    .map_err(|e| CredentialError::InvalidToken(e.to_string()))?
                    .with_timezone(&Utc),
            ),
            (None, None) => None,
        };
        Ok(AccessToken::new(token.access_token, expires_at))
    }
}

#[async_trait]
impl TokenSource for CliTokenSource {
    async fn fetch(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        debug!("Fetching token for {} via {}", scope, self.program);
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--scope")
            .arg(scope)
            .output()
            .await
            .map_err(|e| CredentialError::CommandFailed {
                command: self.command_line(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(CredentialError::CommandFailed {
                command: self.command_line(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Self::parse(&String::from_utf8_lossy(&output.stdout))
    }
}
