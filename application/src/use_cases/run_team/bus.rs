//! In-process group transport.
//!
//! Keeps the group conversation in memory and records what the orchestrator
//! asked for. The team runtime drains those requests between orchestrator
//! events.

use crate::ports::transport::{GroupTransport, Topic, TransportError};
use async_trait::async_trait;
use hypoloop_domain::ChatMessage;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct BusState {
    group: Vec<ChatMessage>,
    output: Vec<ChatMessage>,
    /// Index into `group` of the first message each participant has not seen
    cursors: HashMap<String, usize>,
    resets: Vec<String>,
    pending: Option<String>,
    terminated: Option<String>,
}

pub(crate) struct TeamBus {
    members: HashSet<String>,
    state: Mutex<BusState>,
}

impl TeamBus {
    pub(crate) fn new(members: impl IntoIterator<Item = String>) -> Self {
        Self {
            members: members.into_iter().collect(),
            state: Mutex::new(BusState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        // A poisoned lock still holds consistent data; nothing panics mid-update.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_member(&self, participant: &str) -> Result<(), TransportError> {
        if self.members.contains(participant) {
            Ok(())
        } else {
            Err(TransportError::UnknownParticipant(participant.to_string()))
        }
    }

    /// Restore the group log from a resumed thread and re-issue the request
    /// the orchestrator was waiting on.
    pub(crate) fn resume(&self, history: Vec<ChatMessage>, awaiting: Option<&str>) {
        let mut state = self.state();
        state.group = history;
        state.pending = awaiting.map(str::to_string);
    }

    /// Participants reset since the last call
    pub(crate) fn take_resets(&self) -> Vec<String> {
        std::mem::take(&mut self.state().resets)
    }

    /// The participant whose reply is requested, if any
    pub(crate) fn take_request(&self) -> Option<String> {
        self.state().pending.take()
    }

    /// Group messages `participant` has not seen yet; marks them seen.
    pub(crate) fn unseen(&self, participant: &str) -> Vec<ChatMessage> {
        let mut state = self.state();
        let total = state.group.len();
        let cursor = state.cursors.get(participant).copied().unwrap_or(0);
        let unseen = state.group[cursor.min(total)..].to_vec();
        state.cursors.insert(participant.to_string(), total);
        unseen
    }

    pub(crate) fn post(&self, message: ChatMessage) {
        self.state().group.push(message);
    }

    pub(crate) fn terminated(&self) -> Option<String> {
        self.state().terminated.clone()
    }

    /// Everything published on the output topic
    pub(crate) fn transcript(&self) -> Vec<ChatMessage> {
        self.state().output.clone()
    }
}

#[async_trait]
impl GroupTransport for TeamBus {
    async fn start(&self, messages: &[ChatMessage]) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.terminated.is_some() {
            *state = BusState::default();
        }
        state.group.extend_from_slice(messages);
        state.output.extend_from_slice(messages);
        Ok(())
    }

    async fn reset(&self, participant: &str) -> Result<(), TransportError> {
        self.check_member(participant)?;
        let mut state = self.state();
        let total = state.group.len();
        state.cursors.insert(participant.to_string(), total);
        state.resets.push(participant.to_string());
        Ok(())
    }

    async fn request_response(&self, participant: &str) -> Result<(), TransportError> {
        self.check_member(participant)?;
        self.state().pending = Some(participant.to_string());
        Ok(())
    }

    async fn publish(&self, topic: Topic, message: &ChatMessage) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.terminated.is_some() {
            return Err(TransportError::Closed);
        }
        match topic {
            Topic::Group => state.group.push(message.clone()),
            Topic::Output => state.output.push(message.clone()),
        }
        Ok(())
    }

    async fn terminate(&self, reason: &str) -> Result<(), TransportError> {
        let mut state = self.state();
        state.pending = None;
        state.terminated = Some(reason.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> TeamBus {
        TeamBus::new(["Adder".to_string(), "Multiplier".to_string()])
    }

    #[tokio::test]
    async fn test_reset_hides_earlier_messages() {
        let bus = bus();
        bus.start(&[ChatMessage::text("user", "question")]).await.unwrap();
        bus.publish(Topic::Group, &ChatMessage::text("Orchestrator", "old context"))
            .await
            .unwrap();

        bus.reset("Adder").await.unwrap();
        bus.publish(Topic::Group, &ChatMessage::text("Orchestrator", "new context"))
            .await
            .unwrap();

        let seen: Vec<String> = bus.unseen("Adder").iter().map(|m| m.content_text()).collect();
        assert_eq!(seen, vec!["new context"]);
        assert!(bus.unseen("Adder").is_empty());
        // Never reset, so the Multiplier sees the whole log
        assert_eq!(bus.unseen("Multiplier").len(), 3);
        assert_eq!(bus.take_resets(), vec!["Adder"]);
        assert!(bus.take_resets().is_empty());
    }

    #[tokio::test]
    async fn test_request_is_taken_once() {
        let bus = bus();
        bus.request_response("Adder").await.unwrap();
        assert_eq!(bus.take_request().as_deref(), Some("Adder"));
        assert_eq!(bus.take_request(), None);
    }

    #[tokio::test]
    async fn test_unknown_participant_rejected() {
        let bus = bus();
        let err = bus.request_response("Divider").await.unwrap_err();
        assert!(matches!(err, TransportError::UnknownParticipant(name) if name == "Divider"));
    }

    #[tokio::test]
    async fn test_terminate_closes_the_bus() {
        let bus = bus();
        bus.request_response("Adder").await.unwrap();
        bus.terminate("done").await.unwrap();

        assert_eq!(bus.terminated().as_deref(), Some("done"));
        assert_eq!(bus.take_request(), None);
        let err = bus
            .publish(Topic::Output, &ChatMessage::text("Orchestrator", "late"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[tokio::test]
    async fn test_output_topic_forms_transcript() {
        let bus = bus();
        bus.start(&[ChatMessage::text("user", "question")]).await.unwrap();
        bus.publish(Topic::Output, &ChatMessage::text("Orchestrator", "instruction"))
            .await
            .unwrap();
        assert_eq!(bus.transcript().len(), 2);
        assert_eq!(bus.unseen("Adder").len(), 1);
    }
}
