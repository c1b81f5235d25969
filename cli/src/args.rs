//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for hypoloop
#[derive(Parser, Debug)]
#[command(name = "hypoloop")]
#[command(author, version, about = "Answer a question by planning hypotheses and testing them with a team")]
#[command(long_about = r#"
hypoloop runs a question through an orchestrator that plans hypotheses,
assigns tests to a team of model-backed participants and tracks progress
until the question is answered or a turn limit is reached.

The team is defined in the configuration file:

  [provider]
  model = "gpt-4o"

  [[participants]]
  name = "Adder"
  description = "Adds two integers."

Configuration files are loaded from (in priority order):
1. HYPOLOOP_* environment variables (HYPOLOOP_PROVIDER__MODEL=gpt-4o)
2. --config <path>     Explicit config file
3. ./hypoloop.toml     Project-level config
4. <config dir>/hypoloop/config.toml   Global config

Example:
  hypoloop "What is (33+22)*(2+3)?"
  hypoloop --checkpoint run.json "Why is the grass green?"
  hypoloop --checkpoint run.json --resume
"#)]
pub struct Cli {
    /// The question to answer (not needed with --resume or --show-config)
    pub question: Option<String>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration sources and the effective configuration, then exit
    #[arg(long)]
    pub show_config: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Also write diagnostic logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Write a JSONL transcript of orchestration events
    #[arg(long, value_name = "PATH")]
    pub conversation_log: Option<PathBuf>,

    /// Save a snapshot after every orchestrator event
    #[arg(long, value_name = "PATH")]
    pub checkpoint: Option<PathBuf>,

    /// Continue the run saved in --checkpoint
    #[arg(long, requires = "checkpoint")]
    pub resume: bool,

    /// Override [orchestrator] max_turns_total (0 = no limit)
    #[arg(long, value_name = "N")]
    pub max_turns: Option<usize>,

    /// Print the final answer as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Default tracing filter for the verbosity flag, `None` when not given
    pub fn verbosity_filter(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("info"),
            2 => Some("debug"),
            _ => Some("trace"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_question() {
        let cli = Cli::try_parse_from(["hypoloop", "-vv", "What is 2+2?"]).unwrap();
        assert_eq!(cli.question.as_deref(), Some("What is 2+2?"));
        assert_eq!(cli.verbosity_filter(), Some("debug"));
        assert!(!cli.resume);
    }

    #[test]
    fn test_resume_requires_checkpoint() {
        assert!(Cli::try_parse_from(["hypoloop", "--resume"]).is_err());
        let cli =
            Cli::try_parse_from(["hypoloop", "--checkpoint", "run.json", "--resume"]).unwrap();
        assert!(cli.resume);
        assert!(cli.question.is_none());
    }

    #[test]
    fn test_no_verbosity() {
        let cli = Cli::try_parse_from(["hypoloop", "q"]).unwrap();
        assert_eq!(cli.verbosity_filter(), None);
    }
}
