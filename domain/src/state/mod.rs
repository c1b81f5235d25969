//! Runtime state of an orchestrator

pub mod snapshot;
pub mod stall;

pub use snapshot::{OrchestratorPhase, OrchestratorSnapshot};
pub use stall::StallCounter;
