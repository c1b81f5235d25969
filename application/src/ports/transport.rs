//! Group transport port
//!
//! The orchestrator never talks to participants directly. It publishes
//! messages to topics and asks the transport to collect a response from a
//! participant; the response arrives later through
//! [`Orchestrator::handle_agent_response`](crate::use_cases::orchestrate::Orchestrator::handle_agent_response).

use async_trait::async_trait;
use hypoloop_domain::ChatMessage;
use thiserror::Error;

/// Errors from the message transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("Transport closed")]
    Closed,

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Where a published message goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Visible to every participant
    Group,
    /// Visible to whoever is watching the run
    Output,
}

impl Topic {
    pub fn as_str(&self) -> &str {
        match self {
            Topic::Group => "group",
            Topic::Output => "output",
        }
    }
}

/// Message delivery between the orchestrator and the team
#[async_trait]
pub trait GroupTransport: Send + Sync {
    /// Broadcast the messages that start a run
    async fn start(&self, messages: &[ChatMessage]) -> Result<(), TransportError>;

    /// Clear a participant's conversation state
    async fn reset(&self, participant: &str) -> Result<(), TransportError>;

    /// Ask a participant to respond to the group conversation
    async fn request_response(&self, participant: &str) -> Result<(), TransportError>;

    async fn publish(&self, topic: Topic, message: &ChatMessage) -> Result<(), TransportError>;

    /// End the run
    async fn terminate(&self, reason: &str) -> Result<(), TransportError>;
}
