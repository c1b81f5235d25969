//! Facts and the fact sheet

use super::markdown::MarkdownBlock;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How a fact was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FactSource {
    /// Stated or directly implied by the question
    Question,
    /// Produced by a test carried out by the team
    TestResult,
}

/// A fact relevant to the question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Fact {
    /// Fact content
    pub content: String,
    /// How this fact was derived
    pub source: FactSource,
    /// Any applicable notes
    #[serde(default)]
    pub notes: Option<String>,
    /// If the source is `test_result`, the name of the test that produced this fact
    #[serde(default)]
    pub supporting_test: Option<String>,
}

impl Fact {
    pub fn from_question(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: FactSource::Question,
            notes: None,
            supporting_test: None,
        }
    }

    pub fn from_test(content: impl Into<String>, test_name: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: FactSource::TestResult,
            notes: None,
            supporting_test: Some(test_name.into()),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// All known facts relevant to the question, in discovery order.
///
/// The sheet only grows. New facts are appended as they arrive, without
/// deduplication against existing entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FactSheet {
    /// All known facts relevant to our task
    pub facts: Vec<Fact>,
}

impl FactSheet {
    pub fn new(facts: Vec<Fact>) -> Self {
        Self { facts }
    }

    /// Append facts as-is. Returns how many were added.
    pub fn extend<I>(&mut self, facts: I) -> usize
    where
        I: IntoIterator<Item = Fact>,
    {
        let before = self.facts.len();
        self.facts.extend(facts);
        self.facts.len() - before
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

impl MarkdownBlock for Fact {}
impl MarkdownBlock for FactSheet {}
