//! Next-speaker selection.

use super::Orchestrator;
use super::types::{FinishReason, Flow, OrchestratorError};
use crate::ports::conversation_logger::ConversationEvent;
use crate::ports::transport::Topic;
use hypoloop_domain::{
    ChatMessage, LlmMessage, NextSpeaker, OrchestratorPhase, OrchestratorPrompt, SpeakerChoices,
};
use serde_json::json;
use tracing::{debug, info};

impl Orchestrator {
    /// Pick a participant among the non-benched roster and hand them the
    /// instruction. A null choice ends the run.
    pub(super) async fn select_next_speaker(&mut self) -> Result<Flow, OrchestratorError> {
        let names = self.roster.names();
        let available: Vec<String> = self
            .plan_ref()?
            .available_members(&names)
            .into_iter()
            .map(String::from)
            .collect();
        let choices = SpeakerChoices::new(available.iter().cloned());

        let mut context = self.thread.to_context(&self.name);
        context.push(LlmMessage::user(
            self.name.clone(),
            OrchestratorPrompt::next_speaker(&available),
        ));

        let next: NextSpeaker = self
            .structured
            .produce(
                &context,
                &choices,
                self.params.max_structured_retries,
                self.cancellation_token.as_ref(),
            )
            .await?;

        let Some(participant) = next.speaker().map(str::to_string) else {
            debug!("No viable speaker: {}", next.next_speaker.reason);
            return self
                .finalize(FinishReason::NoViableSpeaker(next.next_speaker.reason))
                .await;
        };

        info!("Next speaker: {}", participant);
        self.conversation_logger.log(ConversationEvent::new(
            "speaker_selected",
            json!({
                "turn": self.total_turns,
                "speaker": participant,
                "reason": next.next_speaker.reason,
                "instruction": next.instruction(),
            }),
        ));
        self.progress.on_speaker(&participant, next.instruction());

        let instruction = ChatMessage::text(self.name.clone(), next.instruction());
        self.thread.push(instruction.clone());
        self.transport.publish(Topic::Output, &instruction).await?;
        self.transport.publish(Topic::Group, &instruction).await?;
        self.transport.request_response(&participant).await?;

        self.set_phase(OrchestratorPhase::AwaitingResponse(participant));
        Ok(Flow::Suspend)
    }
}
