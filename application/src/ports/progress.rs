//! Progress notification port
//!
//! Defines the interface for reporting progress during an orchestrated run.

use hypoloop_domain::{FinalAnswer, OrchestratorPhase, Plan, ProgressLedger};

/// Why the plan was replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplanReason {
    Stall,
    Completion,
}

impl ReplanReason {
    pub fn as_str(&self) -> &str {
        match self {
            ReplanReason::Stall => "stall",
            ReplanReason::Completion => "completion",
        }
    }
}

/// Callback for progress updates during a run
///
/// All methods default to no-ops, so implementations only override what
/// they display.
pub trait OrchestrationProgress: Send + Sync {
    fn on_phase_change(&self, _phase: &OrchestratorPhase) {}

    fn on_plan(&self, _plan: &Plan, _reason: Option<ReplanReason>) {}

    fn on_ledger(&self, _ledger: &ProgressLedger) {}

    fn on_stall(&self, _stall_count: usize, _max_stalls: usize) {}

    fn on_speaker(&self, _participant: &str, _instruction: &str) {}

    fn on_final_answer(&self, _answer: &FinalAnswer) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl OrchestrationProgress for NoProgress {}
