//! Configuration file loading for hypoloop
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `HYPOLOOP_` environment variables (`HYPOLOOP_PROVIDER__MODEL=gpt-4o`)
//! 2. `--config <path>` specified file
//! 3. Project root: `./hypoloop.toml` or `./.hypoloop.toml`
//! 4. Global: `<config dir>/hypoloop/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileAuthMethod, FileConfig, FileLoggingConfig, FileOrchestratorConfig,
    FileParticipantConfig, FileProviderConfig,
};
pub use loader::ConfigLoader;
