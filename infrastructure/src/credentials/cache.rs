//! Expiry-checked token cache

use super::source::{AccessToken, CredentialError, TokenSource};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Tokens are refreshed this many minutes before they expire
pub const DEFAULT_REFRESH_MARGIN_MINUTES: i64 = 5;

/// Caches one token per scope.
///
/// The lock is held across a refresh, so concurrent callers for an expired
/// scope wait for a single fetch instead of each starting their own.
pub struct CredentialCache {
    source: Arc<dyn TokenSource>,
    margin: chrono::Duration,
    tokens: Mutex<HashMap<String, AccessToken>>,
}

impl CredentialCache {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            margin: chrono::Duration::minutes(DEFAULT_REFRESH_MARGIN_MINUTES),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_margin(mut self, margin: chrono::Duration) -> Self {
        self.margin = margin;
        self
    }

    /// A token for `scope` that is valid for at least the refresh margin
    pub async fn token(&self, scope: &str) -> Result<String, CredentialError> {
        let mut tokens = self.tokens.lock().await;
        if let Some(cached) = tokens.get(scope)
            && cached.is_fresh(Utc::now(), self.margin)
        {
            return Ok(cached.token.clone());
        }

        debug!("Refreshing credential for scope {}", scope);
        let fresh = self.source.fetch(scope).await?;
        let token = fresh.token.clone();
        tokens.insert(scope.to_string(), fresh);
        Ok(token)
    }

    /// Drop the cached token for `scope`, e.g. after the server rejected it
    pub async fn invalidate(&self, scope: &str) {
        self.tokens.lock().await.remove(scope);
    }
}
