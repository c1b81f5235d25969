//! Infrastructure layer for hypoloop
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod checkpoint;
pub mod config;
pub mod credentials;
pub mod logging;
pub mod participants;
pub mod providers;

// Re-export commonly used types
pub use checkpoint::JsonFileCheckpoint;
pub use config::{
    ConfigLoader, ConfigValidationError, FileAuthMethod, FileConfig, FileLoggingConfig,
    FileOrchestratorConfig, FileParticipantConfig, FileProviderConfig,
};
pub use credentials::{
    AccessToken, ApiKey, CliTokenSource, CredentialCache, CredentialError, TokenSource,
};
pub use logging::JsonlConversationLogger;
pub use participants::LlmParticipant;
pub use providers::{OpenAiBackend, OpenAiConfig, ProviderError};
