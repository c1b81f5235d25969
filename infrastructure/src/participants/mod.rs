//! Participant adapters

mod llm;

pub use llm::LlmParticipant;
