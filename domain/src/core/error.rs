//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An update-by-key found no matching element.
    ///
    /// This means the plan in memory and the record being committed have
    /// diverged (a renamed test, a stale hypothesis). It is never recoverable.
    #[error("State integrity violation: {0}")]
    StateIntegrity(String),

    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("Invalid roster: {0}")]
    InvalidRoster(String),
}

impl DomainError {
    /// Check if this error signals corrupted orchestration state
    pub fn is_state_integrity(&self) -> bool {
        matches!(self, DomainError::StateIntegrity(_))
    }
}
