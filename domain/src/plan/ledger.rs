//! Progress ledger
//!
//! The orchestrator's per-turn assessment of where the current test stands.
//! Ledgers are never merged: each one replaces the previous.

use super::entities::Test;
use super::facts::Fact;
use super::markdown::MarkdownBlock;
use super::reasoned::ReasonedBoolean;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Assessment of progress on the current test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressLedger {
    /// Has the original question been fully answered?
    pub is_request_satisfied: ReasonedBoolean,
    /// Is the team repeating the same requests or responses without progress?
    pub is_in_loop: ReasonedBoolean,
    /// Is forward progress being made on the current test?
    pub is_progress_being_made: ReasonedBoolean,
    /// Facts learned since the last ledger
    #[serde(default)]
    pub new_facts: Vec<Fact>,
    /// The current test, updated with any new state, result or evidence
    pub current_test: Test,
}

impl ProgressLedger {
    /// The turn counts against the stall budget when no progress is made or
    /// the team is looping.
    pub fn is_stalling(&self) -> bool {
        !self.is_progress_being_made.answer || self.is_in_loop.answer
    }

    pub fn test_finished(&self) -> bool {
        self.current_test.is_finished()
    }
}

impl MarkdownBlock for ProgressLedger {}

/// The test a ledger is requested for. A ledger about any other test is
/// rejected before it reaches the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerScope {
    test_name: String,
}

impl LedgerScope {
    pub fn new(test: &Test) -> Self {
        Self {
            test_name: test.name.clone(),
        }
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub(crate) fn check(&self, ledger: &ProgressLedger) -> Result<(), String> {
        if ledger.current_test.name != self.test_name {
            return Err(format!(
                "current_test must be the test under assessment '{}', not '{}'",
                self.test_name, ledger.current_test.name
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::entities::TestState;

    fn ledger(progress: bool, looping: bool) -> ProgressLedger {
        ProgressLedger {
            is_request_satisfied: ReasonedBoolean::new(false, "not yet"),
            is_in_loop: ReasonedBoolean::new(looping, "r"),
            is_progress_being_made: ReasonedBoolean::new(progress, "r"),
            new_facts: vec![],
            current_test: Test::new("sum", "add"),
        }
    }

    #[test]
    fn test_is_stalling() {
        assert!(!ledger(true, false).is_stalling());
        assert!(ledger(false, false).is_stalling());
        assert!(ledger(true, true).is_stalling());
        assert!(ledger(false, true).is_stalling());
    }

    #[test]
    fn test_deserialize_from_model_json() {
        let json = r#"{
            "is_request_satisfied": {"reason": "waiting on multiplier", "answer": false},
            "is_in_loop": {"reason": "first answer", "answer": false},
            "is_progress_being_made": {"reason": "sum computed", "answer": true},
            "new_facts": [{"content": "33 + 22 = 55", "source": "test_result", "supporting_test": "sum"}],
            "current_test": {
                "name": "sum",
                "description": "add",
                "state": "complete",
                "plan": [],
                "result": "55"
            }
        }"#;
        let ledger: ProgressLedger = serde_json::from_str(json).unwrap();
        assert!(ledger.test_finished());
        assert_eq!(ledger.current_test.state, TestState::Complete);
        assert_eq!(ledger.new_facts.len(), 1);
    }

    #[test]
    fn test_scope_rejects_other_test() {
        let scope = LedgerScope::new(&Test::new("product", "multiply"));
        let err = scope.check(&ledger(true, false)).unwrap_err();
        assert!(err.contains("'product'"));
        assert!(err.contains("'sum'"));

        let scope = LedgerScope::new(&Test::new("sum", "add"));
        assert!(scope.check(&ledger(true, false)).is_ok());
    }
}
