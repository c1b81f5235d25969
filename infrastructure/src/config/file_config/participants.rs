//! Team members from TOML (`[[participants]]` array)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileParticipantConfig {
    /// Unique name; the orchestrator addresses the participant by it
    pub name: String,
    /// Shown to the orchestrator when planning and picking speakers
    pub description: String,
    /// System prompt (default: "You are {name}. {description}")
    pub system_prompt: Option<String>,
    /// Model override (default: `[provider] model`)
    pub model: Option<String>,
}
