//! Output files from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset, e.g. "hypoloop=debug"
    pub filter: Option<String>,
    /// Diagnostic log file (in addition to stderr)
    pub log_file: Option<PathBuf>,
    /// JSONL transcript of orchestration events
    pub conversation_log: Option<PathBuf>,
    /// Snapshot file written after every orchestrator event
    pub checkpoint: Option<PathBuf>,
}
