//! The working thread for the current hypothesis
//!
//! The thread starts with one pinned context message (question, team, facts
//! and the hypothesis under test) followed by the turns taken since. The
//! pinned message is rebuilt whenever the fact sheet grows, without touching
//! the turns.

use super::message::{ChatMessage, LlmMessage, MessageKind};
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageThread {
    pinned: Option<ChatMessage>,
    turns: Vec<ChatMessage>,
}

impl MessageThread {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything and start over from a single pinned context message.
    pub fn reset_with(&mut self, context: ChatMessage) {
        self.pinned = Some(context);
        self.turns.clear();
    }

    /// Swap the pinned context message, keeping the turns.
    pub fn replace_pinned(&mut self, context: ChatMessage) -> Result<(), DomainError> {
        match self.pinned.as_mut() {
            Some(pinned) => {
                *pinned = context;
                Ok(())
            }
            None => Err(DomainError::StateIntegrity(
                "no pinned context message to replace".to_string(),
            )),
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.turns.push(message);
    }

    pub fn clear(&mut self) {
        self.pinned = None;
        self.turns.clear();
    }

    pub fn pinned(&self) -> Option<&ChatMessage> {
        self.pinned.as_ref()
    }

    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len() + usize::from(self.pinned.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All messages, pinned first
    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.pinned.iter().chain(self.turns.iter())
    }

    /// Convert the thread into model context as seen by `orchestrator`.
    ///
    /// Tool call requests and executions are skipped. Stop and handoff
    /// messages are always user messages. Otherwise the orchestrator's own
    /// messages become assistant messages and everyone else's user messages.
    pub fn to_context(&self, orchestrator: &str) -> Vec<LlmMessage> {
        self.iter()
            .filter(|m| !m.kind.is_tool_traffic())
            .map(|m| match m.kind {
                MessageKind::Stop | MessageKind::Handoff => {
                    LlmMessage::user(m.source.clone(), m.content.clone())
                }
                _ if m.source == orchestrator => {
                    LlmMessage::assistant(m.source.clone(), m.content.clone())
                }
                _ => LlmMessage::user(m.source.clone(), m.content.clone()),
            })
            .collect()
    }
}
