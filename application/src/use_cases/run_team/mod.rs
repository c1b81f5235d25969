//! Run Team use case
//!
//! Runs a question through the orchestrator with in-process participants.
//! The team bus stands in for the group transport: each time the
//! orchestrator asks a participant for a reply, the runtime hands that
//! participant the group messages it has not seen yet and feeds the reply
//! back as the next event.

mod bus;

use crate::config::OrchestrationParams;
use crate::ports::bench_policy::BenchingPolicy;
use crate::ports::checkpoint::CheckpointStore;
use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger};
use crate::ports::model_backend::ModelBackend;
use crate::ports::participant::Participant;
use crate::ports::progress::{NoProgress, OrchestrationProgress};
use crate::ports::transport::GroupTransport;
use crate::use_cases::orchestrate::{Orchestrator, OrchestratorError};
use bus::TeamBus;
use hypoloop_domain::{
    ChatMessage, DomainError, FinalAnswer, OrchestratorPhase, OrchestratorSnapshot, Roster,
    TeamMember,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that can occur while running a team
#[derive(Error, Debug)]
pub enum RunTeamError {
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error("Invalid team: {0}")]
    Roster(#[from] DomainError),

    #[error("No participants configured")]
    NoParticipants,

    #[error("Participant '{0}' is configured more than once")]
    DuplicateParticipant(String),

    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("Run stalled: nothing requested while {0}")]
    Stalled(String),
}

impl RunTeamError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunTeamError::Orchestrator(e) if e.is_cancelled())
    }
}

/// Input for the RunTeam use case
#[derive(Debug, Clone)]
pub struct RunTeamInput {
    /// Messages that open the run; ignored when resuming
    pub messages: Vec<ChatMessage>,
    /// Snapshot to resume from instead of starting over
    pub resume_from: Option<OrchestratorSnapshot>,
}

impl RunTeamInput {
    pub fn new(question: impl Into<String>) -> Self {
        Self::from_messages(vec![ChatMessage::text("user", question)])
    }

    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            resume_from: None,
        }
    }

    pub fn resume(snapshot: OrchestratorSnapshot) -> Self {
        Self {
            messages: Vec::new(),
            resume_from: Some(snapshot),
        }
    }
}

/// Output of a finished run
#[derive(Debug, Clone)]
pub struct RunTeamOutput {
    pub final_answer: Option<FinalAnswer>,
    /// Why the run ended, as passed to the transport on termination
    pub finish_reason: String,
    pub snapshot: OrchestratorSnapshot,
    /// Messages published on the output topic, in order
    pub transcript: Vec<ChatMessage>,
}

/// Use case for running a team of in-process participants
pub struct RunTeamUseCase<B: ModelBackend + 'static> {
    backend: Arc<B>,
    participants: Vec<Arc<dyn Participant>>,
    params: OrchestrationParams,
    orchestrator_name: Option<String>,
    conversation_logger: Arc<dyn ConversationLogger>,
    progress: Arc<dyn OrchestrationProgress>,
    bench_policy: Option<Arc<dyn BenchingPolicy>>,
    checkpoint: Option<Arc<dyn CheckpointStore>>,
    cancellation_token: Option<CancellationToken>,
}

impl<B: ModelBackend + 'static> RunTeamUseCase<B> {
    pub fn new(backend: Arc<B>, participants: Vec<Arc<dyn Participant>>) -> Self {
        Self {
            backend,
            participants,
            params: OrchestrationParams::default(),
            orchestrator_name: None,
            conversation_logger: Arc::new(NoConversationLogger),
            progress: Arc::new(NoProgress),
            bench_policy: None,
            checkpoint: None,
            cancellation_token: None,
        }
    }

    pub fn with_params(mut self, params: OrchestrationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_orchestrator_name(mut self, name: impl Into<String>) -> Self {
        self.orchestrator_name = Some(name.into());
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn OrchestrationProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_bench_policy(mut self, policy: Arc<dyn BenchingPolicy>) -> Self {
        self.bench_policy = Some(policy);
        self
    }

    /// Save a snapshot after every orchestrator event
    pub fn with_checkpoint(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoint = Some(store);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    fn roster(&self) -> Result<Roster, RunTeamError> {
        if self.participants.is_empty() {
            return Err(RunTeamError::NoParticipants);
        }
        let mut members: Vec<TeamMember> = Vec::with_capacity(self.participants.len());
        for participant in &self.participants {
            if members.iter().any(|m| m.name == participant.name()) {
                return Err(RunTeamError::DuplicateParticipant(
                    participant.name().to_string(),
                ));
            }
            members.push(TeamMember::new(participant.name(), participant.description()));
        }
        Ok(Roster::new(members)?)
    }

    fn build_orchestrator(&self, roster: Roster, bus: Arc<TeamBus>) -> Orchestrator {
        let mut orchestrator = Orchestrator::new(roster, self.backend.clone(), bus)
            .with_params(self.params.clone())
            .with_conversation_logger(self.conversation_logger.clone())
            .with_progress(self.progress.clone());
        if let Some(name) = &self.orchestrator_name {
            orchestrator = orchestrator.with_name(name.clone());
        }
        if let Some(policy) = &self.bench_policy {
            orchestrator = orchestrator.with_bench_policy(policy.clone());
        }
        if let Some(token) = &self.cancellation_token {
            orchestrator = orchestrator.with_cancellation(token.clone());
        }
        orchestrator
    }

    /// Run until the orchestrator terminates
    pub async fn execute(&self, input: RunTeamInput) -> Result<RunTeamOutput, RunTeamError> {
        let roster = self.roster()?;
        let participants: HashMap<String, Arc<dyn Participant>> = self
            .participants
            .iter()
            .map(|p| (p.name().to_string(), p.clone()))
            .collect();

        let bus = Arc::new(TeamBus::new(roster.names()));
        let mut orchestrator = self.build_orchestrator(roster, bus.clone());

        match input.resume_from {
            Some(snapshot) => {
                info!("Resuming run from snapshot at turn {}", snapshot.n_rounds);
                let history = snapshot.message_thread.iter().cloned().collect();
                orchestrator.load_state(snapshot);
                bus.resume(history, orchestrator.phase().awaiting());
                if let OrchestratorPhase::Terminated(reason) = orchestrator.phase() {
                    bus.terminate(reason)
                        .await
                        .map_err(OrchestratorError::from)?;
                }
            }
            None => {
                info!("Starting run with {} participants", participants.len());
                orchestrator.handle_start(input.messages).await?;
            }
        }
        self.save_checkpoint(&orchestrator);

        loop {
            for name in bus.take_resets() {
                if let Some(participant) = participants.get(&name) {
                    participant.reset().await;
                }
            }

            if let Some(reason) = bus.terminated() {
                info!("Run finished: {}", reason);
                return Ok(RunTeamOutput {
                    final_answer: orchestrator.final_answer().cloned(),
                    finish_reason: reason,
                    snapshot: orchestrator.save_state(),
                    transcript: bus.transcript(),
                });
            }

            let Some(name) = bus.take_request() else {
                return Err(RunTeamError::Stalled(orchestrator.phase().to_string()));
            };
            let participant = participants
                .get(&name)
                .ok_or_else(|| RunTeamError::UnknownParticipant(name.clone()))?;

            let reply = self.ask(participant.as_ref(), &bus, &mut orchestrator).await?;
            bus.post(reply.clone());
            orchestrator.handle_agent_response(reply).await?;
            self.save_checkpoint(&orchestrator);
        }
    }

    /// Ask one participant for its reply. Failures become an ordinary
    /// message from that participant.
    async fn ask(
        &self,
        participant: &dyn Participant,
        bus: &TeamBus,
        orchestrator: &mut Orchestrator,
    ) -> Result<ChatMessage, RunTeamError> {
        let name = participant.name().to_string();
        let messages = bus.unseen(&name);
        debug!("Asking {} ({} new messages)", name, messages.len());

        let result = match &self.cancellation_token {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(OrchestratorError::Cancelled.into()),
                    result = participant.respond(&messages) => result,
                }
            }
            None => participant.respond(&messages).await,
        };

        match result {
            Ok(mut reply) => {
                reply.source = name.clone();
                orchestrator.record_participant_success(&name);
                Ok(reply)
            }
            Err(e) => {
                warn!("Participant {} failed: {}", name, e);
                self.conversation_logger.log(ConversationEvent::new(
                    "participant_failed",
                    json!({
                        "participant": name,
                        "error": e.to_string(),
                    }),
                ));
                orchestrator.record_participant_failure(&name);
                Ok(ChatMessage::text(name, format!("Error: {e}")))
            }
        }
    }

    fn save_checkpoint(&self, orchestrator: &Orchestrator) {
        let Some(store) = &self.checkpoint else {
            return;
        };
        if let Err(e) = store.save(&orchestrator.save_state()) {
            warn!("Failed to save checkpoint: {}", e);
        }
    }
}
