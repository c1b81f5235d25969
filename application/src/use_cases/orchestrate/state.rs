//! Checkpointing of the orchestrator's runtime state.

use super::Orchestrator;
use hypoloop_domain::OrchestratorSnapshot;
use tracing::debug;

impl Orchestrator {
    /// Capture everything needed to resume this run
    pub fn save_state(&self) -> OrchestratorSnapshot {
        OrchestratorSnapshot {
            message_thread: self.thread.clone(),
            current_turn: self.current_turn,
            question: self.question.clone(),
            fact_sheet: self.fact_sheet.clone(),
            plan: self.plan.clone(),
            current_ledger: self.current_ledger.clone(),
            n_rounds: self.total_turns,
            n_stalls: self.stalls,
            hypothesis_turns: self.hypothesis_turns,
            test_turns: self.test_turns,
            phase: self.phase.clone(),
            final_answer: self.final_answer.clone(),
            participant_failures: self.participant_failures.clone(),
        }
    }

    /// Restore a snapshot as-is, replacing all runtime state.
    pub fn load_state(&mut self, snapshot: OrchestratorSnapshot) {
        debug!(
            "Loading state at turn {} ({})",
            snapshot.n_rounds, snapshot.phase
        );
        self.thread = snapshot.message_thread;
        self.current_turn = snapshot.current_turn;
        self.question = snapshot.question;
        self.fact_sheet = snapshot.fact_sheet;
        self.plan = snapshot.plan;
        self.current_ledger = snapshot.current_ledger;
        self.total_turns = snapshot.n_rounds;
        self.stalls = snapshot.n_stalls;
        self.hypothesis_turns = snapshot.hypothesis_turns;
        self.test_turns = snapshot.test_turns;
        self.phase = snapshot.phase;
        self.final_answer = snapshot.final_answer;
        self.participant_failures = snapshot.participant_failures;
    }
}
