//! The team taking part in a run

use crate::core::error::DomainError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// A participant as the orchestrator sees it: a name and what it can do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub description: String,
}

impl TeamMember {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Ordered set of team members with unique names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    members: Vec<TeamMember>,
}

impl Roster {
    pub fn new(members: Vec<TeamMember>) -> Result<Self, DomainError> {
        if members.is_empty() {
            return Err(DomainError::InvalidRoster(
                "a team needs at least one member".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for member in &members {
            if member.name.trim().is_empty() {
                return Err(DomainError::InvalidRoster(
                    "member name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(member.name.as_str()) {
                return Err(DomainError::InvalidRoster(format!(
                    "duplicate member name '{}'",
                    member.name
                )));
            }
        }
        Ok(Self { members })
    }

    pub fn members(&self) -> &[TeamMember] {
        &self.members
    }

    pub fn names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.iter().any(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Markdown table of names and descriptions, one row per member.
    ///
    /// Whitespace runs inside a row collapse to a single space so multi-line
    /// descriptions keep the table intact.
    pub fn to_markdown_table(&self) -> String {
        let mut table = String::from("| Name | Description |\n| ---- | ----------- |\n");
        for member in &self.members {
            let row = format!("| {} | {} |", member.name, member.description);
            table.push_str(WHITESPACE_RE.replace_all(&row, " ").trim());
            table.push('\n');
        }
        table.trim().to_string()
    }
}
