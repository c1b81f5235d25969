//! Plan domain entities
//!
//! A [`Plan`] is an ordered list of [`Hypothesis`] entries, each decomposed
//! into one or more [`Test`]s. Hypotheses and tests are processed strictly
//! in plan order: the "current" one is always the first that is still open.
//!
//! Hypothesis text and test name are the keys used to splice updated records
//! back into the plan. An update whose key is unknown is a
//! [`DomainError::StateIntegrity`], never a silent insert.

use super::markdown::MarkdownBlock;
use crate::core::error::DomainError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Evidence backing a test result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Evidence {
    /// Source of the evidence e.g., team member name, file name, URL
    pub source: String,
    /// Relevant content from the source
    pub content: String,
}

impl Evidence {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }
}

/// Role of a team member in a test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TestMemberPlan {
    /// Name of the team member
    pub name: String,
    /// How we envision the team member contributing to the test
    pub plan: String,
    /// Why we believe this team member can perform the test, based on their description
    pub rationale: String,
}

/// State of a test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TestState {
    /// Work on the test has not concluded
    #[default]
    Incomplete,
    /// The test was carried out and produced a result
    Complete,
    /// The test was given up on
    Abandoned,
}

impl TestState {
    pub fn as_str(&self) -> &str {
        match self {
            TestState::Incomplete => "incomplete",
            TestState::Complete => "complete",
            TestState::Abandoned => "abandoned",
        }
    }

    /// Complete and abandoned tests are both finished
    pub fn is_finished(&self) -> bool {
        !matches!(self, TestState::Incomplete)
    }
}

impl std::fmt::Display for TestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A test which is part of a hypothesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Test {
    /// Name of the test, unique within its hypothesis
    pub name: String,
    /// Description of the test
    pub description: String,
    /// State of the test
    pub state: TestState,
    /// Team members involved and how we envision them carrying out the test
    pub plan: Vec<TestMemberPlan>,
    /// Result of the test
    #[serde(default)]
    pub result: Option<String>,
    /// Supporting evidence for the result, e.g. the team member that provided it and a summary of their response
    #[serde(default)]
    pub supporting_evidence: Option<Vec<Evidence>>,
}

impl Test {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            state: TestState::Incomplete,
            plan: Vec::new(),
            result: None,
            supporting_evidence: None,
        }
    }

    pub fn with_member(
        mut self,
        name: impl Into<String>,
        plan: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        self.plan.push(TestMemberPlan {
            name: name.into(),
            plan: plan.into(),
            rationale: rationale.into(),
        });
        self
    }

    pub fn with_state(mut self, state: TestState) -> Self {
        self.state = state;
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.supporting_evidence
            .get_or_insert_with(Vec::new)
            .push(evidence);
        self
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("test name cannot be empty".to_string());
        }
        Ok(())
    }
}

/// State of a hypothesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisState {
    #[default]
    Unverified,
    Verified,
    Unverifiable,
}

impl HypothesisState {
    pub fn as_str(&self) -> &str {
        match self {
            HypothesisState::Unverified => "unverified",
            HypothesisState::Verified => "verified",
            HypothesisState::Unverifiable => "unverifiable",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, HypothesisState::Unverified)
    }
}

impl std::fmt::Display for HypothesisState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A falsifiable claim under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Hypothesis {
    /// Hypothesis to be tested, unique within the plan
    pub hypothesis: String,
    /// State of the hypothesis
    pub state: HypothesisState,
    /// When concluded, a summary of the results
    #[serde(default)]
    pub completion_summary: Option<String>,
    /// Tests for the hypothesis. Hypotheses must have at least one test
    #[schemars(length(min = 1))]
    pub tests: Vec<Test>,
}

impl Hypothesis {
    pub fn new(hypothesis: impl Into<String>, tests: Vec<Test>) -> Self {
        Self {
            hypothesis: hypothesis.into(),
            state: HypothesisState::Unverified,
            completion_summary: None,
            tests,
        }
    }

    pub fn text(&self) -> &str {
        &self.hypothesis
    }

    /// No test is still incomplete
    pub fn all_tests_finished(&self) -> bool {
        self.tests.iter().all(Test::is_finished)
    }

    /// Every test is complete (a stricter condition than finished)
    pub fn all_tests_completed(&self) -> bool {
        self.tests.iter().all(|t| t.state == TestState::Complete)
    }

    /// First test still incomplete, in declared order
    pub fn current_test(&self) -> Option<&Test> {
        self.tests.iter().find(|t| !t.is_finished())
    }

    /// Replace the test sharing `test.name`.
    ///
    /// A finished test is final: overwriting it is a state integrity error,
    /// the same as naming a test that does not exist.
    pub fn update_test(&mut self, test: Test) -> Result<(), DomainError> {
        match self.tests.iter_mut().find(|t| t.name == test.name) {
            Some(slot) if slot.is_finished() => Err(DomainError::StateIntegrity(format!(
                "Test '{}' in hypothesis '{}' is already {}",
                slot.name, self.hypothesis, slot.state
            ))),
            Some(slot) => {
                *slot = test;
                Ok(())
            }
            None => Err(DomainError::StateIntegrity(format!(
                "Test '{}' not found in hypothesis '{}'",
                test.name, self.hypothesis
            ))),
        }
    }

    /// Move an open hypothesis whose tests are all finished into its terminal
    /// state: verified when every test completed, unverifiable otherwise.
    ///
    /// Returns the new state, or `None` when nothing changed.
    pub fn conclude(&mut self) -> Option<HypothesisState> {
        if self.state.is_terminal() || !self.all_tests_finished() {
            return None;
        }
        self.state = if self.all_tests_completed() {
            HypothesisState::Verified
        } else {
            HypothesisState::Unverifiable
        };
        Some(self.state)
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.hypothesis.trim().is_empty() {
            return Err("hypothesis text cannot be empty".to_string());
        }
        if self.tests.is_empty() {
            return Err(format!(
                "hypothesis '{}' must have at least one test",
                self.hypothesis
            ));
        }
        let mut names = HashSet::new();
        for test in &self.tests {
            test.validate()?;
            if !names.insert(test.name.as_str()) {
                return Err(format!(
                    "duplicate test name '{}' in hypothesis '{}'",
                    test.name, self.hypothesis
                ));
            }
        }
        Ok(())
    }
}

/// The hypotheses to work through and the members currently sidelined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    /// Hypotheses to be tested, in the order they should be worked on
    #[schemars(length(min = 1))]
    pub hypotheses: Vec<Hypothesis>,
    /// Team members who are benched due to repeated unrecoverable errors
    #[serde(default)]
    pub benched_team_members: Vec<String>,
}

impl Plan {
    pub fn new(hypotheses: Vec<Hypothesis>) -> Self {
        Self {
            hypotheses,
            benched_team_members: Vec::new(),
        }
    }

    /// First hypothesis still unverified, in plan order
    pub fn current_hypothesis(&self) -> Option<&Hypothesis> {
        self.hypotheses
            .iter()
            .find(|h| h.state == HypothesisState::Unverified)
    }

    pub fn current_hypothesis_mut(&mut self) -> Option<&mut Hypothesis> {
        self.hypotheses
            .iter_mut()
            .find(|h| h.state == HypothesisState::Unverified)
    }

    /// Conclude leading hypotheses whose tests are all finished, stopping at
    /// the first one that still has an open test.
    ///
    /// Returns each concluded hypothesis text with its new state, in order.
    pub fn conclude_finished(&mut self) -> Vec<(String, HypothesisState)> {
        let mut concluded = Vec::new();
        while let Some(hypothesis) = self.current_hypothesis_mut() {
            match hypothesis.conclude() {
                Some(state) => concluded.push((hypothesis.hypothesis.clone(), state)),
                None => break,
            }
        }
        concluded
    }

    /// Replace the hypothesis sharing `hypothesis.hypothesis`.
    pub fn update_hypothesis(&mut self, hypothesis: Hypothesis) -> Result<(), DomainError> {
        match self
            .hypotheses
            .iter_mut()
            .find(|h| h.hypothesis == hypothesis.hypothesis)
        {
            Some(slot) => {
                *slot = hypothesis;
                Ok(())
            }
            None => Err(DomainError::StateIntegrity(format!(
                "Hypothesis '{}' not found in the plan",
                hypothesis.hypothesis
            ))),
        }
    }

    pub fn is_benched(&self, member: &str) -> bool {
        self.benched_team_members.iter().any(|m| m == member)
    }

    /// Bench a member. Returns false if they were already benched.
    pub fn bench(&mut self, member: impl Into<String>) -> bool {
        let member = member.into();
        if self.is_benched(&member) {
            return false;
        }
        self.benched_team_members.push(member);
        true
    }

    /// Roster members that are not benched, in roster order
    pub fn available_members<'a>(&self, roster: &'a [String]) -> Vec<&'a str> {
        roster
            .iter()
            .filter(|m| !self.is_benched(m))
            .map(String::as_str)
            .collect()
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.hypotheses.is_empty() {
            return Err("plan must have at least one hypothesis".to_string());
        }
        let mut texts = HashSet::new();
        for hypothesis in &self.hypotheses {
            hypothesis.validate()?;
            if !texts.insert(hypothesis.hypothesis.as_str()) {
                return Err(format!(
                    "duplicate hypothesis '{}' in plan",
                    hypothesis.hypothesis
                ));
            }
        }
        Ok(())
    }
}

impl MarkdownBlock for Test {}
impl MarkdownBlock for Hypothesis {}
impl MarkdownBlock for Plan {}
