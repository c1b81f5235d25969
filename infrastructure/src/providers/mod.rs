//! Model backend adapters

mod openai;

pub use openai::{OPENAI_BASE_URL, OpenAiBackend, OpenAiConfig, ProviderError};
