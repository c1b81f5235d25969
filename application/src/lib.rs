//! Application layer for hypoloop
//!
//! This crate contains the orchestrator, use cases, port definitions, and
//! application configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod structured;
pub mod use_cases;

// Re-export commonly used types
pub use config::OrchestrationParams;
pub use ports::{
    bench_policy::{BenchAfterFailures, BenchingPolicy, NeverBench},
    checkpoint::{CheckpointError, CheckpointStore, NoCheckpoint},
    conversation_logger::{
        ConversationEvent, ConversationLogger, MemoryConversationLogger, NoConversationLogger,
    },
    model_backend::{BackendError, ModelBackend, ModelCapabilities},
    participant::{Participant, ParticipantError},
    progress::{NoProgress, OrchestrationProgress, ReplanReason},
    transport::{GroupTransport, Topic, TransportError},
};
pub use structured::RetryCoordinator;
pub use use_cases::orchestrate::{
    DEFAULT_ORCHESTRATOR_NAME, FinishReason, Orchestrator, OrchestratorError,
};
pub use use_cases::run_team::{RunTeamError, RunTeamInput, RunTeamOutput, RunTeamUseCase};
