//! Types for the orchestrator: errors and finish reasons.

use crate::ports::model_backend::BackendError;
use crate::ports::transport::TransportError;
use hypoloop_domain::DomainError;
use thiserror::Error;

/// Errors that abort an orchestrated run
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("No valid {schema} after {attempts} attempts: {last_error}")]
    RetryExhausted {
        schema: String,
        attempts: usize,
        last_error: String,
    },

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Orchestrator has not been started")]
    NotStarted,

    #[error("Operation cancelled")]
    Cancelled,
}

impl OrchestratorError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrchestratorError::Cancelled)
    }

    /// Check if the plan in memory diverged from a record being committed
    pub fn is_state_integrity(&self) -> bool {
        matches!(self, OrchestratorError::Domain(e) if e.is_state_integrity())
    }
}

/// Why a run moved to its final answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    /// The ledger reported the question answered, with its reason
    RequestSatisfied(String),
    /// `max_turns_total` was exceeded
    TurnCeiling(usize),
    /// The speaker choice came back null, with its reason
    NoViableSpeaker(String),
    AllMembersBenched,
    NoRemainingHypotheses,
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinishReason::RequestSatisfied(reason) => write!(f, "{}", reason),
            FinishReason::TurnCeiling(max) => write!(f, "turn ceiling reached ({} turns)", max),
            FinishReason::NoViableSpeaker(reason) => write!(f, "no viable speaker: {}", reason),
            FinishReason::AllMembersBenched => write!(f, "all team members benched"),
            FinishReason::NoRemainingHypotheses => write!(f, "no remaining hypotheses"),
        }
    }
}

/// What the loop does after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Flow {
    /// Run another loop iteration
    Iterate { first: bool },
    /// Waiting on a participant, or terminated
    Suspend,
}
