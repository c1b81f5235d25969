//! Prompts the orchestrator sends to its own model

use crate::plan::{FactSheet, Hypothesis, MarkdownBlock, Plan, ProgressLedger, Test};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static FINAL_ANSWER_PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(question|finish_reason|fact_sheet|plan)\}").expect("valid regex")
});

/// Templates for each step of a hypothesis-driven run
pub struct OrchestratorPrompt;

/// Inputs shared by every prompt that describes the current hypothesis
#[derive(Debug, Clone, Copy)]
pub struct HypothesisContext<'a> {
    pub question: &'a str,
    pub team_description: &'a str,
    pub fact_sheet: &'a FactSheet,
    pub hypothesis: &'a Hypothesis,
}

impl OrchestratorPrompt {
    /// System persona for the orchestrator
    pub fn persona() -> &'static str {
        r#"You are the orchestrator of a team of specialists working together to answer a question.
You work scientifically: you collect facts, form hypotheses that could answer the question, and design tests that can verify or falsify each hypothesis.
You do not carry out tests yourself. You direct team members, one at a time, and judge their results critically.
A hypothesis is only verified when its tests were actually carried out and produced supporting results."#
    }

    /// First planning step: facts stated in or implied by the question
    pub fn initial_fact_sheet(question: &str) -> String {
        format!(
            r#"{}

## Question

{}

## Task

Before any work begins, build a fact sheet for the question above. List the facts that are given in the question or that follow directly from it. Every fact must have the source `question`. Do not guess: only list what you can state with confidence."#,
            Self::persona(),
            question
        )
    }

    /// Second planning step: hypotheses and tests over the team
    pub fn initial_plan(team_description: &str) -> String {
        format!(
            r#"## Team

{}

## Task

Using the fact sheet, create a plan to answer the question. The plan is an ordered list of hypotheses. Each hypothesis must be a falsifiable claim that, if verified, answers the question or brings us closer to an answer.

For each hypothesis, design one or more tests. Each test names the team members involved, what each of them will do, and why their description says they can do it. Only use team members from the table above. Test names must be unique within a hypothesis and hypothesis statements must be unique within the plan.

Order the hypotheses so the most promising one comes first. Leave `benched_team_members` empty."#,
            team_description
        )
    }

    /// Pinned context at the top of every hypothesis thread
    pub fn hypothesis_context(ctx: HypothesisContext<'_>) -> String {
        let current_test = ctx
            .hypothesis
            .current_test()
            .map(|t| t.to_markdown(Some("Current Test")))
            .unwrap_or_else(|| "## Current Test\n\nAll tests have been completed.".to_string());

        format!(
            r#"{}

## Question

{}

## Team

{}

{}

{}

{}"#,
            Self::persona(),
            ctx.question,
            ctx.team_description,
            ctx.fact_sheet.to_markdown(Some("Fact Sheet")),
            ctx.hypothesis.to_markdown(Some("Current Hypothesis")),
            current_test
        )
    }

    /// Per-turn assessment of the current test
    pub fn progress_ledger(current_test: &Test, previous: Option<&ProgressLedger>) -> String {
        let previous = previous
            .map(|l| l.to_markdown(Some("Previous Progress Ledger")))
            .unwrap_or_else(|| {
                "## Previous Progress Ledger\n\nNo progress ledger exists yet. Create one from scratch."
                    .to_string()
            });

        format!(
            r#"{}

{}

## Task

Review the conversation so far and update the progress ledger for the current test.

- `is_request_satisfied`: true only if the original question has been fully answered with supporting evidence.
- `is_in_loop`: true if team members are repeating the same requests or responses.
- `is_progress_being_made`: true if the last turns moved the current test forward. Errors and refusals are not progress.
- `new_facts`: facts learned since the previous ledger. Leave it empty if nothing new was learned. Use the source `test_result` and name the supporting test.
- `current_test`: the current test with its updated state. Mark it `complete` with a `result` and `supporting_evidence` when the team produced a result, or `abandoned` if it cannot be carried out. Keep the test name unchanged."#,
            current_test.to_markdown(Some("Current Test")),
            previous
        )
    }

    /// Choose who acts next on the current test
    pub fn next_speaker(names: &[String]) -> String {
        format!(
            r#"## Task

Decide which team member should speak next to move the current test forward, and write the instruction or question for them. The instruction must be self-contained: include every number, fact or detail the team member needs.

Choose one of: {}.

If none of these team members can move the test forward, answer null."#,
            names.join(", ")
        )
    }

    /// Replace the plan after the team stalled on the current test
    pub fn update_plan_on_stall(ctx: HypothesisContext<'_>, plan: &Plan) -> String {
        format!(
            r#"{}

## Plan Update

The team has stalled on the current test: it is looping, not making progress, or has run out of turns. Update the plan.

- You may rewrite, reorder, add or remove hypotheses and tests that have not finished.
- Do not change hypotheses or tests that are already finished.
- If a team member repeatedly failed with unrecoverable errors, add them to `benched_team_members` and do not plan work for them.
- If the current test cannot be carried out by anyone, mark it `abandoned`.

{}"#,
            Self::hypothesis_context(ctx),
            plan.to_markdown(Some("Current Plan"))
        )
    }

    /// Revise the plan after every test of the current hypothesis finished
    pub fn update_plan_on_completion(ctx: HypothesisContext<'_>, plan: &Plan) -> String {
        format!(
            r#"{}

## Plan Update

Every test of the current hypothesis has finished. Update the plan in light of the results.

- Record a `completion_summary` for the current hypothesis.
- Revise the remaining hypotheses using what the tests revealed. Add new ones if needed.
- Do not change hypotheses that are already verified or unverifiable.

{}"#,
            Self::hypothesis_context(ctx),
            plan.to_markdown(Some("Current Plan"))
        )
    }

    /// Default final-answer prompt template
    pub const FINAL_ANSWER_TEMPLATE: &'static str = r#"## Question

{question}

## Why the work ended

{finish_reason}

{fact_sheet}

{plan}

## Task

Write the final answer to the question using only the facts and test results above. Set `status` to `complete` if the question was answered, otherwise `incomplete` with a `failure_reason`. Set `completed_by_team_members` to true only if the team's results produced the answer."#;

    /// Final answer prompt, from `template` or the default template.
    ///
    /// Recognized placeholders: `{question}`, `{finish_reason}`,
    /// `{fact_sheet}` and `{plan}`.
    pub fn final_answer(
        template: Option<&str>,
        question: &str,
        finish_reason: &str,
        fact_sheet: &FactSheet,
        plan: Option<&Plan>,
    ) -> String {
        let plan = plan
            .map(|p| p.to_markdown(Some("Plan")))
            .unwrap_or_else(|| "## Plan\n\nNo plan was created.".to_string());

        let fact_sheet = fact_sheet.to_markdown(Some("Fact Sheet"));

        // One pass, so substituted text is never scanned for placeholders
        FINAL_ANSWER_PLACEHOLDER_RE
            .replace_all(
                template.unwrap_or(Self::FINAL_ANSWER_TEMPLATE),
                |caps: &Captures| match &caps[1] {
                    "question" => question.to_string(),
                    "finish_reason" => finish_reason.to_string(),
                    "fact_sheet" => fact_sheet.clone(),
                    _ => plan.clone(),
                },
            )
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Fact, TestState};

    fn hypothesis() -> Hypothesis {
        Hypothesis::new(
            "(33+22)*(2+3) = 275",
            vec![
                Test::new("left", "Compute 33 + 22").with_state(TestState::Complete),
                Test::new("right", "Compute 2 + 3"),
            ],
        )
    }

    #[test]
    fn test_hypothesis_context_shows_current_test() {
        let h = hypothesis();
        let sheet = FactSheet::new(vec![Fact::from_question("two sums are multiplied")]);
        let prompt = OrchestratorPrompt::hypothesis_context(HypothesisContext {
            question: "What is (33+22)*(2+3)?",
            team_description: "| Name | Description |",
            fact_sheet: &sheet,
            hypothesis: &h,
        });
        assert!(prompt.contains("## Current Test"));
        assert!(prompt.contains("Compute 2 + 3"));
        assert!(prompt.contains("two sums are multiplied"));
    }

    #[test]
    fn test_hypothesis_context_without_open_tests() {
        let h = Hypothesis::new(
            "h",
            vec![Test::new("t", "d").with_state(TestState::Abandoned)],
        );
        let sheet = FactSheet::default();
        let prompt = OrchestratorPrompt::hypothesis_context(HypothesisContext {
            question: "q",
            team_description: "",
            fact_sheet: &sheet,
            hypothesis: &h,
        });
        assert!(prompt.contains("All tests have been completed."));
    }

    #[test]
    fn test_progress_ledger_without_previous() {
        let prompt = OrchestratorPrompt::progress_ledger(&Test::new("t", "d"), None);
        assert!(prompt.contains("Create one from scratch"));
    }

    #[test]
    fn test_next_speaker_lists_names() {
        let prompt =
            OrchestratorPrompt::next_speaker(&["Adder".to_string(), "Multiplier".to_string()]);
        assert!(prompt.contains("Adder, Multiplier"));
    }

    #[test]
    fn test_final_answer_template_override() {
        let sheet = FactSheet::default();
        let prompt = OrchestratorPrompt::final_answer(
            Some("Q={question} R={finish_reason}"),
            "why?",
            "turn ceiling reached",
            &sheet,
            None,
        );
        assert_eq!(prompt, "Q=why? R=turn ceiling reached");
    }

    #[test]
    fn test_final_answer_default_template() {
        let sheet = FactSheet::default();
        let prompt = OrchestratorPrompt::final_answer(None, "why?", "done", &sheet, None);
        assert!(prompt.contains("why?"));
        assert!(prompt.contains("No plan was created."));
        assert!(!prompt.contains("{plan}"));
    }

    #[test]
    fn test_final_answer_does_not_expand_placeholders_in_values() {
        let sheet = FactSheet::default();
        let prompt = OrchestratorPrompt::final_answer(
            Some("Q={question} R={finish_reason}"),
            "what does {plan} mean?",
            "no viable speaker: {fact_sheet}",
            &sheet,
            None,
        );
        assert_eq!(prompt, "Q=what does {plan} mean? R=no viable speaker: {fact_sheet}");
    }
}
