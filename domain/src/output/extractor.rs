//! Structured-response extraction
//!
//! Model replies are free text: reasoning first, then a fenced `json` block
//! holding the record. Only the first such block counts.

use super::structured::StructuredOutput;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static JSON_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json\r?\n(.*?)\r?\n```").expect("valid regex")
});

/// Why a reply could not be turned into a record.
///
/// Always recoverable: the caller may ask the model again with the
/// diagnostic attached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("no structured block found")]
    NoBlock,

    #[error("validation failed: {0}")]
    Validation(String),
}

/// Body of the first fenced `json` block, if any
pub fn extract_block(text: &str) -> Option<&str> {
    JSON_BLOCK_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Extract, deserialize and check a structured record from a model reply.
pub fn extract_structured<T: StructuredOutput>(
    text: &str,
    ctx: &T::Context,
) -> Result<T, ParseError> {
    let block = extract_block(text).ok_or(ParseError::NoBlock)?;
    let value: T =
        serde_json::from_str(block).map_err(|e| ParseError::Validation(e.to_string()))?;
    value.check(ctx).map_err(ParseError::Validation)?;
    Ok(value)
}
