//! Participant port
//!
//! A team member driven by the in-process runtime.

use async_trait::async_trait;
use hypoloop_domain::ChatMessage;
use thiserror::Error;

/// Why a participant could not produce a reply
///
/// Never fatal to a run: the failure is reported back into the
/// conversation as an ordinary message from that participant.
#[derive(Error, Debug)]
pub enum ParticipantError {
    #[error("Tool failed: {0}")]
    ToolFailed(String),

    #[error("Model request failed: {0}")]
    ModelFailed(String),

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait Participant: Send + Sync {
    /// Unique name within the team
    fn name(&self) -> &str;

    /// What this participant can do, shown to the orchestrator when planning
    fn description(&self) -> &str;

    /// Reply to the messages seen since the last reset
    async fn respond(&self, messages: &[ChatMessage]) -> Result<ChatMessage, ParticipantError>;

    /// Forget any conversation state
    async fn reset(&self) {}
}
