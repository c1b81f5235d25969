//! Markdown rendering for prompt context.
//!
//! Every record the orchestrator shows back to the model (fact sheets, plans,
//! ledgers, final answers) is rendered as a pretty-printed JSON block, the
//! same shape the model is asked to produce.

use serde::Serialize;

/// Render a serializable record as a fenced `json` block, optionally titled.
pub trait MarkdownBlock: Serialize {
    fn to_markdown(&self, title: Option<&str>) -> String {
        let json = serde_json::to_string_pretty(self).unwrap_or_default();
        match title {
            Some(title) => format!("## {}\n\n```json\n{}\n```", title, json),
            None => format!("```json\n{}\n```", json),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        value: u32,
    }

    impl MarkdownBlock for Sample {}

    #[test]
    fn test_untitled_block() {
        let md = Sample { value: 7 }.to_markdown(None);
        assert!(md.starts_with("```json\n"));
        assert!(md.ends_with("\n```"));
        assert!(md.contains("\"value\": 7"));
    }

    #[test]
    fn test_titled_block() {
        let md = Sample { value: 1 }.to_markdown(Some("Initial Fact Sheet"));
        assert!(md.starts_with("## Initial Fact Sheet\n\n```json\n"));
    }
}
