//! Answers paired with the reasoning that produced them

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A yes/no answer with its reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReasonedBoolean {
    /// Reasoning behind the answer
    pub reason: String,
    pub answer: bool,
}

impl ReasonedBoolean {
    pub fn new(answer: bool, reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            answer,
        }
    }
}

/// A free-text answer with its reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReasonedString {
    /// Reasoning behind the answer
    pub reason: String,
    pub answer: String,
}

impl ReasonedString {
    pub fn new(answer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            answer: answer.into(),
        }
    }
}

/// A choice among a fixed set of options, or `null` when none applies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReasonedChoice {
    /// Reasoning behind the choice
    pub reason: String,
    /// The chosen option, or null if no option is viable
    pub answer: Option<String>,
}

impl ReasonedChoice {
    pub fn new(answer: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            answer,
        }
    }
}
