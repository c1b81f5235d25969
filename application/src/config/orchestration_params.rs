//! Orchestration parameters: turn ceilings, stall limits and retries.
//!
//! [`OrchestrationParams`] groups the static parameters that control the
//! hypothesis loop in [`Orchestrator`](crate::use_cases::orchestrate::Orchestrator).

use serde::{Deserialize, Serialize};

/// Loop control parameters for an orchestrated run.
///
/// `None` for a turn ceiling means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationParams {
    /// Maximum loop iterations for the whole run.
    pub max_turns_total: Option<usize>,
    /// Maximum iterations spent on one hypothesis before replanning.
    pub max_turns_per_hypothesis: Option<usize>,
    /// Maximum iterations spent on one test before replanning.
    pub max_turns_per_test: Option<usize>,
    /// Stall count that triggers a replan.
    pub max_stalls: usize,
    /// Override for the final answer prompt template.
    pub final_answer_prompt: Option<String>,
    /// Attempts per structured output request.
    pub max_structured_retries: usize,
}

impl Default for OrchestrationParams {
    fn default() -> Self {
        Self {
            max_turns_total: Some(32),
            max_turns_per_hypothesis: Some(8),
            max_turns_per_test: Some(4),
            max_stalls: 3,
            final_answer_prompt: None,
            max_structured_retries: 10,
        }
    }
}

impl OrchestrationParams {
    // ==================== Builder Methods ====================

    pub fn with_max_turns_total(mut self, max: Option<usize>) -> Self {
        self.max_turns_total = max;
        self
    }

    pub fn with_max_turns_per_hypothesis(mut self, max: Option<usize>) -> Self {
        self.max_turns_per_hypothesis = max;
        self
    }

    pub fn with_max_turns_per_test(mut self, max: Option<usize>) -> Self {
        self.max_turns_per_test = max;
        self
    }

    pub fn with_max_stalls(mut self, max: usize) -> Self {
        self.max_stalls = max;
        self
    }

    pub fn with_final_answer_prompt(mut self, template: impl Into<String>) -> Self {
        self.final_answer_prompt = Some(template.into());
        self
    }

    pub fn with_max_structured_retries(mut self, max: usize) -> Self {
        self.max_structured_retries = max;
        self
    }

    // ==================== Ceiling Checks ====================

    pub fn total_exceeded(&self, total_turns: usize) -> bool {
        self.max_turns_total.is_some_and(|max| total_turns > max)
    }

    pub fn hypothesis_ceiling_reached(&self, hypothesis_turns: usize) -> bool {
        self.max_turns_per_hypothesis
            .is_some_and(|max| hypothesis_turns >= max)
    }

    pub fn test_ceiling_reached(&self, test_turns: usize) -> bool {
        self.max_turns_per_test.is_some_and(|max| test_turns >= max)
    }
}
