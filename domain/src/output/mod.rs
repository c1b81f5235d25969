//! Structured output: schemas, checks and extraction from model replies

pub mod extractor;
pub mod structured;

pub use extractor::{ParseError, extract_block, extract_structured};
pub use structured::StructuredOutput;
