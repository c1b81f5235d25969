//! Final answer synthesis.

use super::Orchestrator;
use super::types::{FinishReason, Flow, OrchestratorError};
use crate::ports::conversation_logger::ConversationEvent;
use crate::ports::transport::Topic;
use hypoloop_domain::{
    ChatMessage, FactSheet, FinalAnswer, LlmMessage, MarkdownBlock, OrchestratorPhase,
    OrchestratorPrompt,
};
use serde_json::json;
use tracing::info;

impl Orchestrator {
    /// Produce the final answer, deliver it and terminate the run.
    pub(super) async fn finalize(&mut self, reason: FinishReason) -> Result<Flow, OrchestratorError> {
        self.set_phase(OrchestratorPhase::Finalizing);
        let reason = reason.to_string();
        info!("Preparing final answer: {}", reason);

        let empty = FactSheet::default();
        let prompt = OrchestratorPrompt::final_answer(
            self.params.final_answer_prompt.as_deref(),
            self.question_text(),
            &reason,
            self.fact_sheet.as_ref().unwrap_or(&empty),
            self.plan.as_ref(),
        );
        let conversation = vec![LlmMessage::user(self.name.clone(), prompt)];

        let answer: FinalAnswer = self
            .structured
            .produce(
                &conversation,
                &(),
                self.params.max_structured_retries,
                self.cancellation_token.as_ref(),
            )
            .await?;

        let message = ChatMessage::text(self.name.clone(), answer.to_markdown(None));
        self.thread.push(message.clone());
        self.transport.publish(Topic::Output, &message).await?;
        self.transport.publish(Topic::Group, &message).await?;
        self.transport.terminate(&reason).await?;

        info!("Final answer ({}): {}", answer.status, answer.result);
        self.conversation_logger.log(ConversationEvent::new(
            "final_answer",
            json!({
                "reason": reason,
                "total_turns": self.total_turns,
                "answer": answer,
            }),
        ));
        self.progress.on_final_answer(&answer);

        self.final_answer = Some(answer);
        self.set_phase(OrchestratorPhase::Terminated(reason));
        Ok(Flow::Suspend)
    }
}
