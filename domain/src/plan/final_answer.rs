//! Final answer

use super::markdown::MarkdownBlock;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Whether the team managed to answer the question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Complete,
    Incomplete,
}

impl AnswerStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AnswerStatus::Complete => "complete",
            AnswerStatus::Incomplete => "incomplete",
        }
    }
}

impl std::fmt::Display for AnswerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The answer delivered when a run terminates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FinalAnswer {
    /// The answer to the question
    pub result: String,
    /// Whether the answer was produced by the team rather than by the orchestrator alone
    pub completed_by_team_members: bool,
    /// Whether the question was fully answered
    pub status: AnswerStatus,
    /// If incomplete, why the team could not answer the question
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl FinalAnswer {
    pub fn is_complete(&self) -> bool {
        self.status == AnswerStatus::Complete
    }
}

impl MarkdownBlock for FinalAnswer {}
