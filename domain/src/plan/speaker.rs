//! Next-speaker selection

use super::markdown::MarkdownBlock;
use super::reasoned::{ReasonedChoice, ReasonedString};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The participants a speaker choice may name.
///
/// Built per request from the live roster minus benched members, so the
/// set always reflects the team as it stands when the question is asked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeakerChoices {
    names: Vec<String>,
}

impl SpeakerChoices {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut choices: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !choices.contains(&name) {
                choices.push(name);
            }
        }
        Self { names: choices }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Who speaks next and what they are asked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NextSpeaker {
    /// The team member who should speak next, or null if no team member can move the test forward
    pub next_speaker: ReasonedChoice,
    /// The instruction or question for the next speaker
    pub instruction_or_question: ReasonedString,
}

impl NextSpeaker {
    /// The chosen participant. Only a null answer means no choice.
    pub fn speaker(&self) -> Option<&str> {
        self.next_speaker.answer.as_deref()
    }

    pub fn instruction(&self) -> &str {
        &self.instruction_or_question.answer
    }

    /// Reject a non-null choice outside `choices`.
    pub fn check_choice(&self, choices: &SpeakerChoices) -> Result<(), String> {
        match self.speaker() {
            Some(name) if !choices.contains(name) => Err(format!(
                "next_speaker.answer '{}' is not one of [{}]",
                name,
                choices.names().join(", ")
            )),
            _ => Ok(()),
        }
    }
}

impl MarkdownBlock for NextSpeaker {}
