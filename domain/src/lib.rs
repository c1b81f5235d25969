//! Domain layer for hypoloop
//!
//! This crate contains the data model and pure logic of a hypothesis-driven
//! team run. It has no dependencies on infrastructure or async concerns.
//!
//! # Core Concepts
//!
//! ## Plan
//!
//! A question is answered by working through a [`Plan`]: an ordered list of
//! [`Hypothesis`] entries, each with one or more [`Test`]s carried out by
//! team members. Facts learned along the way accumulate in a [`FactSheet`].
//!
//! ## Structured output
//!
//! Every record the orchestrator needs from its model (fact sheet, plan,
//! [`ProgressLedger`], [`NextSpeaker`], [`FinalAnswer`]) is requested as a
//! fenced JSON block and parsed with [`extract_structured`].

pub mod core;
pub mod output;
pub mod plan;
pub mod prompt;
pub mod state;
pub mod team;
pub mod thread;

// Re-export commonly used types
pub use core::{error::DomainError, question::Question};
pub use output::{ParseError, StructuredOutput, extract_block, extract_structured};
pub use plan::{
    AnswerStatus, Evidence, Fact, FactSheet, FactSource, FinalAnswer, Hypothesis,
    HypothesisState, LedgerScope, MarkdownBlock, NextSpeaker, Plan, ProgressLedger,
    ReasonedBoolean, ReasonedChoice, ReasonedString, SpeakerChoices, Test, TestMemberPlan,
    TestState,
};
pub use prompt::{HypothesisContext, OrchestratorPrompt, StructuredPrompt};
pub use state::{OrchestratorPhase, OrchestratorSnapshot, StallCounter};
pub use team::{Roster, TeamMember};
pub use thread::{
    ChatMessage, ContentPart, ImageData, LlmMessage, MessageContent, MessageKind, MessageThread,
    Role, strip_images,
};
