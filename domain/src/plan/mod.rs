//! Plan data model
//!
//! Facts, hypotheses, tests and the records the orchestrator asks the model
//! to produce while working through them.

pub mod entities;
pub mod facts;
pub mod final_answer;
pub mod ledger;
pub mod markdown;
pub mod reasoned;
pub mod speaker;

pub use entities::{
    Evidence, Hypothesis, HypothesisState, Plan, Test, TestMemberPlan, TestState,
};
pub use facts::{Fact, FactSheet, FactSource};
pub use final_answer::{AnswerStatus, FinalAnswer};
pub use ledger::{LedgerScope, ProgressLedger};
pub use markdown::MarkdownBlock;
pub use reasoned::{ReasonedBoolean, ReasonedChoice, ReasonedString};
pub use speaker::{NextSpeaker, SpeakerChoices};
