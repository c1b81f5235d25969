//! Progress ledger requests and test commits.

use super::Orchestrator;
use super::types::{FinishReason, Flow, OrchestratorError};
use crate::ports::conversation_logger::ConversationEvent;
use hypoloop_domain::{
    ChatMessage, DomainError, LedgerScope, LlmMessage, OrchestratorPrompt, ProgressLedger,
};
use serde_json::json;
use tracing::{debug, info};

impl Orchestrator {
    /// Assess the current test from the thread so far.
    ///
    /// New facts are appended to the fact sheet as-is and the pinned context
    /// is rebuilt to show them.
    pub(super) async fn update_progress_ledger(&mut self) -> Result<ProgressLedger, OrchestratorError> {
        let current_test = self
            .plan_ref()?
            .current_hypothesis()
            .and_then(|h| h.current_test())
            .cloned()
            .ok_or_else(|| {
                DomainError::StateIntegrity("no incomplete test in the current hypothesis".to_string())
            })?;

        let mut context = self.thread.to_context(&self.name);
        context.push(LlmMessage::user(
            self.name.clone(),
            OrchestratorPrompt::progress_ledger(&current_test, self.current_ledger.as_ref()),
        ));

        let scope = LedgerScope::new(&current_test);
        let ledger: ProgressLedger = self
            .structured
            .produce(
                &context,
                &scope,
                self.params.max_structured_retries,
                self.cancellation_token.as_ref(),
            )
            .await?;

        debug!(
            "Ledger: satisfied={}, in_loop={}, progress={}, test '{}' {}",
            ledger.is_request_satisfied.answer,
            ledger.is_in_loop.answer,
            ledger.is_progress_being_made.answer,
            ledger.current_test.name,
            ledger.current_test.state
        );
        self.conversation_logger.log(ConversationEvent::new(
            "progress_ledger",
            json!({
                "turn": self.total_turns,
                "ledger": ledger,
            }),
        ));
        self.progress.on_ledger(&ledger);

        if !ledger.new_facts.is_empty() {
            let added = self
                .fact_sheet
                .get_or_insert_with(Default::default)
                .extend(ledger.new_facts.iter().cloned());
            info!("Added {} new facts to the fact sheet", added);

            let context = ChatMessage::text(self.name.clone(), self.hypothesis_context_text()?);
            self.thread.replace_pinned(context)?;
        }

        self.current_ledger = Some(ledger.clone());
        Ok(ledger)
    }

    /// Splice a finished test into the plan and decide what comes next.
    pub(super) async fn commit_test(&mut self, ledger: ProgressLedger) -> Result<Flow, OrchestratorError> {
        self.test_turns = 0;
        info!(
            "Test '{}' finished as {}",
            ledger.current_test.name, ledger.current_test.state
        );

        let hypothesis = self.plan_mut()?.current_hypothesis_mut().ok_or_else(|| {
            DomainError::StateIntegrity("no unverified hypothesis in the plan".to_string())
        })?;
        let open_test = hypothesis.current_test().map(|t| t.name.as_str());
        if open_test != Some(ledger.current_test.name.as_str()) {
            return Err(DomainError::StateIntegrity(format!(
                "ledger reports test '{}' but the open test is {}",
                ledger.current_test.name,
                open_test.map_or_else(|| "none".to_string(), |name| format!("'{name}'"))
            ))
            .into());
        }
        hypothesis.update_test(ledger.current_test.clone())?;
        let all_tests_finished = hypothesis.all_tests_finished();

        if ledger.is_request_satisfied.answer {
            info!("Question answered, preparing final answer");
            return self
                .finalize(FinishReason::RequestSatisfied(
                    ledger.is_request_satisfied.reason,
                ))
                .await;
        }

        if all_tests_finished {
            self.replan_on_completion().await?;
        }
        self.select_hypothesis().await
    }
}
