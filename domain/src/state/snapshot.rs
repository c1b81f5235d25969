//! Orchestrator phases and the serializable runtime snapshot

use crate::plan::{FactSheet, FinalAnswer, Plan, ProgressLedger};
use crate::state::stall::StallCounter;
use crate::thread::MessageThread;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where the orchestrator is in a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "phase", content = "detail", rename_all = "snake_case")]
pub enum OrchestratorPhase {
    /// Before start, or after reset
    #[default]
    Idle,
    /// Building the fact sheet and the plan
    Planning,
    /// Working through the current hypothesis
    HypothesisActive,
    /// Replacing the plan after a stall or a completed hypothesis
    Replanning,
    /// Concluding a hypothesis and picking the next one
    HypothesisComplete,
    /// Waiting for the named participant to answer
    AwaitingResponse(String),
    /// Producing the final answer
    Finalizing,
    /// Run over, with the reason it ended
    Terminated(String),
}

impl OrchestratorPhase {
    pub fn as_str(&self) -> &str {
        match self {
            OrchestratorPhase::Idle => "idle",
            OrchestratorPhase::Planning => "planning",
            OrchestratorPhase::HypothesisActive => "hypothesis_active",
            OrchestratorPhase::Replanning => "replanning",
            OrchestratorPhase::HypothesisComplete => "hypothesis_complete",
            OrchestratorPhase::AwaitingResponse(_) => "awaiting_response",
            OrchestratorPhase::Finalizing => "finalizing",
            OrchestratorPhase::Terminated(_) => "terminated",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            OrchestratorPhase::Idle => "Idle",
            OrchestratorPhase::Planning => "Planning",
            OrchestratorPhase::HypothesisActive => "Hypothesis Active",
            OrchestratorPhase::Replanning => "Replanning",
            OrchestratorPhase::HypothesisComplete => "Hypothesis Complete",
            OrchestratorPhase::AwaitingResponse(_) => "Awaiting Response",
            OrchestratorPhase::Finalizing => "Finalizing",
            OrchestratorPhase::Terminated(_) => "Terminated",
        }
    }

    /// The participant a response is expected from, if any
    pub fn awaiting(&self) -> Option<&str> {
        match self {
            OrchestratorPhase::AwaitingResponse(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, OrchestratorPhase::Terminated(_))
    }

    /// A new run may begin from here
    pub fn accepts_start(&self) -> bool {
        matches!(self, OrchestratorPhase::Idle | OrchestratorPhase::Terminated(_))
    }
}

impl std::fmt::Display for OrchestratorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestratorPhase::AwaitingResponse(p) => write!(f, "{} ({})", self.display_name(), p),
            OrchestratorPhase::Terminated(r) => write!(f, "{} ({})", self.display_name(), r),
            _ => write!(f, "{}", self.display_name()),
        }
    }
}

/// Everything needed to resume an orchestrator exactly where it stopped.
///
/// Loading a snapshot restores these values as-is; nothing is re-derived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorSnapshot {
    pub message_thread: MessageThread,
    /// Turn count visible to the transport, mirrors `n_rounds`
    pub current_turn: usize,
    pub question: Option<String>,
    pub fact_sheet: Option<FactSheet>,
    pub plan: Option<Plan>,
    pub current_ledger: Option<ProgressLedger>,
    /// Total loop iterations this run
    pub n_rounds: usize,
    pub n_stalls: StallCounter,
    pub hypothesis_turns: usize,
    pub test_turns: usize,
    pub phase: OrchestratorPhase,
    #[serde(default)]
    pub final_answer: Option<FinalAnswer>,
    /// Consecutive failures per participant, for benching
    #[serde(default)]
    pub participant_failures: BTreeMap<String, usize>,
}

impl OrchestratorSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
