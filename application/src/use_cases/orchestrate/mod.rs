//! Hypothesis-driven orchestrator
//!
//! Drives a team through a question as a state machine:
//!
//! | Phase                 | Entered when                                   |
//! |-----------------------|------------------------------------------------|
//! | Idle                  | constructed, or after `reset`                  |
//! | Planning              | `handle_start` builds the fact sheet and plan  |
//! | HypothesisActive      | a loop iteration is running                    |
//! | Replanning            | stall/ceiling reached, or hypothesis finished  |
//! | HypothesisComplete    | concluding a hypothesis and picking the next   |
//! | AwaitingResponse(p)   | an instruction was sent to participant `p`     |
//! | Finalizing            | producing the final answer                     |
//! | Terminated(reason)    | final answer delivered                         |
//!
//! Each event method takes `&mut self` and runs to completion: it returns
//! once the orchestrator is waiting on a participant or has terminated.

mod finalize;
mod ledger;
mod planning;
mod speaker;
mod state;
mod types;

pub use types::{FinishReason, OrchestratorError};

use types::Flow;

use crate::config::OrchestrationParams;
use crate::ports::bench_policy::{BenchingPolicy, NeverBench};
use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger};
use crate::ports::model_backend::ModelBackend;
use crate::ports::progress::{NoProgress, OrchestrationProgress};
use crate::ports::transport::GroupTransport;
use crate::structured::RetryCoordinator;
use crate::use_cases::shared::check_cancelled;
use hypoloop_domain::{
    ChatMessage, FactSheet, FinalAnswer, MessageThread, OrchestratorPhase, Plan, ProgressLedger,
    Roster, StallCounter,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default name the orchestrator uses as message source
pub const DEFAULT_ORCHESTRATOR_NAME: &str = "Orchestrator";

pub struct Orchestrator {
    name: String,
    roster: Roster,
    team_description: String,
    params: OrchestrationParams,
    transport: Arc<dyn GroupTransport>,
    structured: RetryCoordinator,
    conversation_logger: Arc<dyn ConversationLogger>,
    progress: Arc<dyn OrchestrationProgress>,
    bench_policy: Arc<dyn BenchingPolicy>,
    cancellation_token: Option<CancellationToken>,

    // Runtime state, captured by `save_state`
    phase: OrchestratorPhase,
    question: Option<String>,
    fact_sheet: Option<FactSheet>,
    plan: Option<Plan>,
    current_ledger: Option<ProgressLedger>,
    thread: MessageThread,
    current_turn: usize,
    total_turns: usize,
    hypothesis_turns: usize,
    test_turns: usize,
    stalls: StallCounter,
    final_answer: Option<FinalAnswer>,
    participant_failures: BTreeMap<String, usize>,
}

impl Orchestrator {
    pub fn new(
        roster: Roster,
        backend: Arc<dyn ModelBackend>,
        transport: Arc<dyn GroupTransport>,
    ) -> Self {
        let conversation_logger: Arc<dyn ConversationLogger> = Arc::new(NoConversationLogger);
        Self {
            name: DEFAULT_ORCHESTRATOR_NAME.to_string(),
            team_description: roster.to_markdown_table(),
            roster,
            params: OrchestrationParams::default(),
            transport,
            structured: RetryCoordinator::new(backend),
            conversation_logger,
            progress: Arc::new(NoProgress),
            bench_policy: Arc::new(NeverBench),
            cancellation_token: None,
            phase: OrchestratorPhase::Idle,
            question: None,
            fact_sheet: None,
            plan: None,
            current_ledger: None,
            thread: MessageThread::new(),
            current_turn: 0,
            total_turns: 0,
            hypothesis_turns: 0,
            test_turns: 0,
            stalls: StallCounter::new(),
            final_answer: None,
            participant_failures: BTreeMap::new(),
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_params(mut self, params: OrchestrationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.structured = self.structured.with_conversation_logger(logger.clone());
        self.conversation_logger = logger;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn OrchestrationProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_bench_policy(mut self, policy: Arc<dyn BenchingPolicy>) -> Self {
        self.bench_policy = policy;
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    // ==================== Accessors ====================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> &OrchestratorPhase {
        &self.phase
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn params(&self) -> &OrchestrationParams {
        &self.params
    }

    pub fn question(&self) -> Option<&str> {
        self.question.as_deref()
    }

    pub fn fact_sheet(&self) -> Option<&FactSheet> {
        self.fact_sheet.as_ref()
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn current_ledger(&self) -> Option<&ProgressLedger> {
        self.current_ledger.as_ref()
    }

    pub fn thread(&self) -> &MessageThread {
        &self.thread
    }

    pub fn total_turns(&self) -> usize {
        self.total_turns
    }

    pub fn stall_count(&self) -> usize {
        self.stalls.count()
    }

    pub fn final_answer(&self) -> Option<&FinalAnswer> {
        self.final_answer.as_ref()
    }

    // ==================== Events ====================

    /// Start a run from the given messages.
    ///
    /// Accepted only while idle or terminated; a terminated orchestrator is
    /// reset first.
    pub async fn handle_start(
        &mut self,
        messages: Vec<ChatMessage>,
    ) -> Result<OrchestratorPhase, OrchestratorError> {
        if !self.phase.accepts_start() {
            return Err(OrchestratorError::InvalidEvent(format!(
                "start received while {}",
                self.phase
            )));
        }
        if self.phase.is_terminated() {
            self.reset();
        }

        self.plan_run(&messages).await?;
        let flow = self.select_hypothesis().await?;
        self.drive(flow).await?;
        Ok(self.phase.clone())
    }

    /// Feed a participant's reply back into the loop.
    ///
    /// Only the participant currently awaited is heard; anything else is
    /// logged and dropped, leaving the phase unchanged.
    pub async fn handle_agent_response(
        &mut self,
        message: ChatMessage,
    ) -> Result<OrchestratorPhase, OrchestratorError> {
        if self.phase.awaiting() != Some(message.source.as_str()) {
            warn!(
                "Ignoring response from {} while {}",
                message.source, self.phase
            );
            self.conversation_logger.log(ConversationEvent::new(
                "response_ignored",
                json!({
                    "source": message.source,
                    "phase": self.phase.as_str(),
                }),
            ));
            return Ok(self.phase.clone());
        }

        self.conversation_logger.log(ConversationEvent::new(
            "agent_response",
            json!({
                "source": message.source,
                "content": message.content_text(),
            }),
        ));
        self.thread.push(message);
        self.drive(Flow::Iterate { first: false }).await?;
        Ok(self.phase.clone())
    }

    /// Count a failed reply from `participant` towards benching
    pub fn record_participant_failure(&mut self, participant: &str) {
        *self
            .participant_failures
            .entry(participant.to_string())
            .or_insert(0) += 1;
    }

    /// Clear the failure streak of `participant` after a good reply
    pub fn record_participant_success(&mut self, participant: &str) {
        self.participant_failures.remove(participant);
    }

    /// Clear all state and counters and return to Idle
    pub fn reset(&mut self) {
        self.question = None;
        self.fact_sheet = None;
        self.plan = None;
        self.current_ledger = None;
        self.thread.clear();
        self.current_turn = 0;
        self.total_turns = 0;
        self.hypothesis_turns = 0;
        self.test_turns = 0;
        self.stalls.reset();
        self.final_answer = None;
        self.participant_failures.clear();
        self.set_phase(OrchestratorPhase::Idle);
    }

    // ==================== Loop ====================

    async fn drive(&mut self, mut flow: Flow) -> Result<(), OrchestratorError> {
        while let Flow::Iterate { first } = flow {
            check_cancelled(self.cancellation_token.as_ref())?;
            flow = self.iterate(first).await?;
        }
        Ok(())
    }

    /// One pass of the hypothesis loop.
    ///
    /// First iterations of a hypothesis skip the ledger and go straight to
    /// speaker selection.
    async fn iterate(&mut self, first_iteration: bool) -> Result<Flow, OrchestratorError> {
        self.set_phase(OrchestratorPhase::HypothesisActive);

        self.total_turns += 1;
        self.current_turn = self.total_turns;
        self.hypothesis_turns += 1;
        self.test_turns += 1;

        if self.params.total_exceeded(self.total_turns) {
            let max = self.params.max_turns_total.unwrap_or_default();
            return self.finalize(FinishReason::TurnCeiling(max)).await;
        }

        if !first_iteration {
            let ledger = self.update_progress_ledger().await?;
            let stalling = ledger.is_stalling();

            if ledger.test_finished() {
                return self.commit_test(ledger).await;
            }

            let count = self.stalls.record(stalling);
            self.progress.on_stall(count, self.params.max_stalls);
            if stalling {
                warn!("Stall count {}/{}", count, self.params.max_stalls);
            }

            if self.needs_replan() {
                warn!(
                    "Stalled or turn ceiling reached (stalls {}, hypothesis turns {}, test turns {}), updating the plan",
                    count, self.hypothesis_turns, self.test_turns
                );
                self.replan_on_stall().await?;
                return self.select_hypothesis().await;
            }
        }

        self.select_next_speaker().await
    }

    fn needs_replan(&self) -> bool {
        self.stalls.reached(self.params.max_stalls)
            || self.params.hypothesis_ceiling_reached(self.hypothesis_turns)
            || self.params.test_ceiling_reached(self.test_turns)
    }

    fn set_phase(&mut self, phase: OrchestratorPhase) {
        if self.phase != phase {
            info!("Orchestrator phase: {} -> {}", self.phase, phase);
            self.phase = phase;
            self.progress.on_phase_change(&self.phase);
        }
    }

    pub(super) fn plan_ref(&self) -> Result<&Plan, OrchestratorError> {
        self.plan.as_ref().ok_or(OrchestratorError::NotStarted)
    }

    pub(super) fn plan_mut(&mut self) -> Result<&mut Plan, OrchestratorError> {
        self.plan.as_mut().ok_or(OrchestratorError::NotStarted)
    }

    pub(super) fn question_text(&self) -> &str {
        self.question.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests;
