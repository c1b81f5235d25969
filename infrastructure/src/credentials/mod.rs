//! Credentials for model backends
//!
//! A [`TokenSource`] fetches bearer tokens; the [`CredentialCache`] keeps
//! them per scope and refreshes them shortly before they expire.

mod cache;
mod source;

pub use cache::{CredentialCache, DEFAULT_REFRESH_MARGIN_MINUTES};
pub use source::{AccessToken, ApiKey, CliTokenSource, CredentialError, TokenSource};
