//! Orchestrator configuration from TOML (`[orchestrator]` section)

use hypoloop_application::OrchestrationParams;
use hypoloop_application::use_cases::orchestrate::DEFAULT_ORCHESTRATOR_NAME;
use serde::{Deserialize, Serialize};

/// Turn limits use `0` for "no limit".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOrchestratorConfig {
    /// Name the orchestrator uses in the conversation
    pub name: String,
    /// Model override for the orchestrator (default: `[provider] model`)
    pub model: Option<String>,
    pub max_turns_total: usize,
    pub max_turns_per_hypothesis: usize,
    pub max_turns_per_test: usize,
    /// Stall count that triggers a replan
    pub max_stalls: usize,
    /// Attempts per structured response before the run fails
    pub max_structured_retries: usize,
    /// Template for the final answer prompt; `{question}`, `{finish_reason}`,
    /// `{fact_sheet}` and `{plan}` are substituted
    pub final_answer_prompt: Option<String>,
    /// Bench a participant after this many consecutive failures
    pub bench_after_failures: Option<usize>,
}

impl Default for FileOrchestratorConfig {
    fn default() -> Self {
        let params = OrchestrationParams::default();
        Self {
            name: DEFAULT_ORCHESTRATOR_NAME.to_string(),
            model: None,
            max_turns_total: params.max_turns_total.unwrap_or(0),
            max_turns_per_hypothesis: params.max_turns_per_hypothesis.unwrap_or(0),
            max_turns_per_test: params.max_turns_per_test.unwrap_or(0),
            max_stalls: params.max_stalls,
            max_structured_retries: params.max_structured_retries,
            final_answer_prompt: None,
            bench_after_failures: None,
        }
    }
}

fn limit(value: usize) -> Option<usize> {
    (value > 0).then_some(value)
}

impl FileOrchestratorConfig {
    pub fn to_params(&self) -> OrchestrationParams {
        let params = OrchestrationParams {
            max_turns_total: limit(self.max_turns_total),
            max_turns_per_hypothesis: limit(self.max_turns_per_hypothesis),
            max_turns_per_test: limit(self.max_turns_per_test),
            max_stalls: self.max_stalls,
            max_structured_retries: self.max_structured_retries,
            ..Default::default()
        };
        match &self.final_answer_prompt {
            Some(template) => params.with_final_answer_prompt(template.clone()),
            None => params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_params() {
        assert_eq!(
            FileOrchestratorConfig::default().to_params(),
            OrchestrationParams::default()
        );
    }

    #[test]
    fn test_zero_means_unlimited() {
        let config = FileOrchestratorConfig {
            max_turns_total: 0,
            max_turns_per_test: 0,
            ..Default::default()
        };
        let params = config.to_params();
        assert_eq!(params.max_turns_total, None);
        assert_eq!(params.max_turns_per_test, None);
        assert_eq!(params.max_turns_per_hypothesis, Some(8));
    }

    #[test]
    fn test_final_answer_prompt() {
        let config = FileOrchestratorConfig {
            final_answer_prompt: Some("Answer {question}".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.to_params().final_answer_prompt.as_deref(),
            Some("Answer {question}")
        );
    }
}
