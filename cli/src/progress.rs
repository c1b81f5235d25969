//! Console progress for orchestration runs

use colored::Colorize;
use hypoloop_application::{OrchestrationProgress, ReplanReason};
use hypoloop_domain::{FinalAnswer, OrchestratorPhase, Plan, ProgressLedger};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const INSTRUCTION_PREVIEW_CHARS: usize = 72;

fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > INSTRUCTION_PREVIEW_CHARS {
        let cut: String = line.chars().take(INSTRUCTION_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

fn plan_lines(plan: &Plan, reason: Option<ReplanReason>) -> Vec<String> {
    let header = match reason {
        Some(reason) => format!("{} ({})", "Replanned".bold().yellow(), reason.as_str()),
        None => "Plan".bold().cyan().to_string(),
    };
    let current = plan.current_hypothesis().map(|h| h.text());
    let mut lines = vec![header];
    for (i, hypothesis) in plan.hypotheses.iter().enumerate() {
        let marker = if current == Some(hypothesis.text()) {
            ">".green().to_string()
        } else {
            " ".to_string()
        };
        lines.push(format!(
            "  {} {}. {} [{}]",
            marker,
            i + 1,
            hypothesis.text(),
            hypothesis.state.as_str().dimmed()
        ));
    }
    lines
}

fn ledger_line(ledger: &ProgressLedger) -> String {
    let test = &ledger.current_test;
    let state = if ledger.is_stalling() {
        test.state.as_str().yellow()
    } else {
        test.state.as_str().green()
    };
    format!("  {} {} [{}]", "test".dimmed(), test.name, state)
}

/// Spinner-based reporter for interactive terminals
pub struct ProgressReporter {
    spinner: ProgressBar,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(Self::spinner_style());
        spinner.enable_steady_tick(Duration::from_millis(120));
        Self { spinner }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    /// Stop the spinner if the run ended without a final answer
    pub fn finish(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestrationProgress for ProgressReporter {
    fn on_phase_change(&self, phase: &OrchestratorPhase) {
        self.spinner.set_prefix(phase.display_name().to_string());
        if !matches!(phase, OrchestratorPhase::AwaitingResponse(_)) {
            self.spinner.set_message("");
        }
    }

    fn on_plan(&self, plan: &Plan, reason: Option<ReplanReason>) {
        for line in plan_lines(plan, reason) {
            self.spinner.println(line);
        }
    }

    fn on_ledger(&self, ledger: &ProgressLedger) {
        self.spinner.println(ledger_line(ledger));
    }

    fn on_stall(&self, stall_count: usize, max_stalls: usize) {
        self.spinner.println(format!(
            "  {} {}/{}",
            "stall".yellow(),
            stall_count,
            max_stalls
        ));
    }

    fn on_speaker(&self, participant: &str, instruction: &str) {
        self.spinner.set_message(format!(
            "{} {}",
            participant.bold(),
            preview(instruction).dimmed()
        ));
    }

    fn on_final_answer(&self, answer: &FinalAnswer) {
        let status = if answer.is_complete() {
            answer.status.as_str().green()
        } else {
            answer.status.as_str().red()
        };
        self.spinner
            .finish_with_message(format!("{} {}", "Answer".bold(), status));
    }
}

/// Line-based reporter for non-interactive output
pub struct SimpleProgress;

impl OrchestrationProgress for SimpleProgress {
    fn on_plan(&self, plan: &Plan, reason: Option<ReplanReason>) {
        for line in plan_lines(plan, reason) {
            eprintln!("{}", line);
        }
    }

    fn on_ledger(&self, ledger: &ProgressLedger) {
        eprintln!("{}", ledger_line(ledger));
    }

    fn on_stall(&self, stall_count: usize, max_stalls: usize) {
        eprintln!("  {} {}/{}", "stall".yellow(), stall_count, max_stalls);
    }

    fn on_speaker(&self, participant: &str, instruction: &str) {
        eprintln!("{} {} {}", "->".cyan(), participant.bold(), preview(instruction));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_long_instructions() {
        let long = "x".repeat(100);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), INSTRUCTION_PREVIEW_CHARS + 3);
        assert!(shown.ends_with("..."));
    }

    #[test]
    fn test_preview_keeps_first_line() {
        assert_eq!(preview("Add 33 and 22\nthen report"), "Add 33 and 22");
    }
}
