//! Prompt domain
//!
//! Templates for every model request the orchestrator makes.

mod orchestrator;
mod structured;

pub use orchestrator::{HypothesisContext, OrchestratorPrompt};
pub use structured::StructuredPrompt;
