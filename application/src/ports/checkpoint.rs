//! Checkpoint port
//!
//! Persists orchestrator snapshots so an interrupted run can be resumed.

use hypoloop_domain::OrchestratorSnapshot;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint is not a valid snapshot: {0}")]
    Format(#[from] serde_json::Error),
}

pub trait CheckpointStore: Send + Sync {
    /// Replace the stored snapshot
    fn save(&self, snapshot: &OrchestratorSnapshot) -> Result<(), CheckpointError>;

    /// The stored snapshot, or `None` when nothing was saved yet
    fn load(&self) -> Result<Option<OrchestratorSnapshot>, CheckpointError>;
}

/// Keeps nothing
pub struct NoCheckpoint;

impl CheckpointStore for NoCheckpoint {
    fn save(&self, _snapshot: &OrchestratorSnapshot) -> Result<(), CheckpointError> {
        Ok(())
    }

    fn load(&self) -> Result<Option<OrchestratorSnapshot>, CheckpointError> {
        Ok(None)
    }
}
