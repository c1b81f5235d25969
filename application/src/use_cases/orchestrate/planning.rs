//! Planning: fact sheet, plan, replans and hypothesis selection.

use super::Orchestrator;
use super::types::{FinishReason, Flow, OrchestratorError};
use crate::ports::conversation_logger::ConversationEvent;
use crate::ports::progress::ReplanReason;
use crate::ports::transport::Topic;
use hypoloop_domain::{
    ChatMessage, DomainError, FactSheet, HypothesisContext, LlmMessage, MarkdownBlock, OrchestratorPhase,
    OrchestratorPrompt, Plan, Question,
};
use serde_json::json;
use tracing::{debug, info, warn};

impl Orchestrator {
    /// Publish the start messages, then build the fact sheet and the plan.
    ///
    /// The planning conversation is private to the orchestrator and is not
    /// published to the group.
    pub(super) async fn plan_run(&mut self, messages: &[ChatMessage]) -> Result<(), OrchestratorError> {
        self.set_phase(OrchestratorPhase::Planning);
        self.transport.start(messages).await?;

        let question = Question::from_parts(messages.iter().map(|m| m.content_text()))?;
        info!("Starting run for question: {}", question);
        self.conversation_logger.log(ConversationEvent::new(
            "run_started",
            json!({
                "question": question.content(),
                "team": self.roster.names(),
            }),
        ));
        self.question = Some(question.into_content());

        let mut conversation = vec![LlmMessage::user(
            self.name.clone(),
            OrchestratorPrompt::initial_fact_sheet(self.question_text()),
        )];
        let fact_sheet: FactSheet = self
            .structured
            .produce(
                &conversation,
                &(),
                self.params.max_structured_retries,
                self.cancellation_token.as_ref(),
            )
            .await?;
        debug!("Initial fact sheet has {} facts", fact_sheet.len());

        conversation.push(LlmMessage::assistant(
            self.name.clone(),
            fact_sheet.to_markdown(Some("Initial Fact Sheet")),
        ));
        conversation.push(LlmMessage::user(
            self.name.clone(),
            OrchestratorPrompt::initial_plan(&self.team_description),
        ));
        let plan: Plan = self
            .structured
            .produce(
                &conversation,
                &(),
                self.params.max_structured_retries,
                self.cancellation_token.as_ref(),
            )
            .await?;
        info!("Initial plan has {} hypotheses", plan.hypotheses.len());

        self.conversation_logger.log(ConversationEvent::new(
            "plan_created",
            json!({
                "fact_sheet": fact_sheet,
                "plan": plan,
            }),
        ));
        self.progress.on_plan(&plan, None);
        self.fact_sheet = Some(fact_sheet);
        self.plan = Some(plan);
        Ok(())
    }

    /// Move to the next hypothesis, or finalize when there is none.
    pub(super) async fn select_hypothesis(&mut self) -> Result<Flow, OrchestratorError> {
        self.set_phase(OrchestratorPhase::HypothesisComplete);

        for member in self.roster.names() {
            self.transport.reset(&member).await?;
        }
        self.hypothesis_turns = 0;
        self.test_turns = 0;
        self.stalls.reset();

        let to_bench = self
            .bench_policy
            .members_to_bench(self.plan_ref()?, &self.participant_failures);
        for member in to_bench {
            if self.plan_mut()?.bench(member.clone()) {
                warn!("Benching {} after repeated failures", member);
                self.conversation_logger.log(ConversationEvent::new(
                    "member_benched",
                    json!({ "member": member }),
                ));
            }
        }

        let names = self.roster.names();
        if self.plan_ref()?.available_members(&names).is_empty() {
            return self.finalize(FinishReason::AllMembersBenched).await;
        }

        for (hypothesis, state) in self.plan_mut()?.conclude_finished() {
            info!("Hypothesis '{}' concluded: {}", hypothesis, state);
        }

        let Some(hypothesis) = self.plan_ref()?.current_hypothesis() else {
            return self.finalize(FinishReason::NoRemainingHypotheses).await;
        };
        info!("Working on hypothesis: {}", hypothesis.hypothesis);

        let context = ChatMessage::text(self.name.clone(), self.hypothesis_context_text()?);
        self.thread.reset_with(context.clone());
        self.current_ledger = None;

        self.transport.publish(Topic::Output, &context).await?;
        self.transport.publish(Topic::Group, &context).await?;

        Ok(Flow::Iterate { first: true })
    }

    pub(super) async fn replan_on_stall(&mut self) -> Result<(), OrchestratorError> {
        self.replan(ReplanReason::Stall).await
    }

    pub(super) async fn replan_on_completion(&mut self) -> Result<(), OrchestratorError> {
        self.replan(ReplanReason::Completion).await
    }

    /// Replace the plan wholesale from a single-message conversation.
    async fn replan(&mut self, reason: ReplanReason) -> Result<(), OrchestratorError> {
        self.set_phase(OrchestratorPhase::Replanning);

        let prompt = {
            let plan = self.plan_ref()?;
            let ctx = self.hypothesis_context()?;
            match reason {
                ReplanReason::Stall => OrchestratorPrompt::update_plan_on_stall(ctx, plan),
                ReplanReason::Completion => {
                    OrchestratorPrompt::update_plan_on_completion(ctx, plan)
                }
            }
        };

        let conversation = vec![LlmMessage::user(self.name.clone(), prompt)];
        let plan: Plan = self
            .structured
            .produce(
                &conversation,
                &(),
                self.params.max_structured_retries,
                self.cancellation_token.as_ref(),
            )
            .await?;

        info!(
            "Plan updated on {} ({} hypotheses, benched: {:?})",
            reason.as_str(),
            plan.hypotheses.len(),
            plan.benched_team_members
        );
        self.conversation_logger.log(ConversationEvent::new(
            "plan_updated",
            json!({
                "reason": reason.as_str(),
                "plan": plan,
            }),
        ));
        self.progress.on_plan(&plan, Some(reason));
        self.plan = Some(plan);
        Ok(())
    }

    /// Prompt inputs describing the current hypothesis
    pub(super) fn hypothesis_context(&self) -> Result<HypothesisContext<'_>, OrchestratorError> {
        let hypothesis = self.plan_ref()?.current_hypothesis().ok_or_else(|| {
            DomainError::StateIntegrity(
                "no unverified hypothesis in the plan".to_string(),
            )
        })?;
        let fact_sheet = self.fact_sheet.as_ref().ok_or(OrchestratorError::NotStarted)?;
        Ok(HypothesisContext {
            question: self.question_text(),
            team_description: &self.team_description,
            fact_sheet,
            hypothesis,
        })
    }

    pub(super) fn hypothesis_context_text(&self) -> Result<String, OrchestratorError> {
        Ok(OrchestratorPrompt::hypothesis_context(
            self.hypothesis_context()?,
        ))
    }
}
