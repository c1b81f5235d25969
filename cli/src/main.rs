//! CLI entrypoint for hypoloop
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod args;
mod progress;
mod team;

use anyhow::{Context, Result, bail};
use args::Cli;
use clap::Parser;
use colored::Colorize;
use hypoloop_application::{
    BenchAfterFailures, CheckpointStore, OrchestrationProgress, RunTeamInput, RunTeamOutput,
    RunTeamUseCase,
};
use hypoloop_infrastructure::{
    ConfigLoader, FileConfig, JsonFileCheckpoint, JsonlConversationLogger,
};
use progress::{ProgressReporter, SimpleProgress};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use team::BackendPool;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Exit status used when the run is interrupted with Ctrl-C
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?
    };
    if let Some(max_turns) = cli.max_turns {
        config.orchestrator.max_turns_total = max_turns;
    }
    if let Some(path) = &cli.log_file {
        config.logging.log_file = Some(path.clone());
    }
    if let Some(path) = &cli.conversation_log {
        config.logging.conversation_log = Some(path.clone());
    }
    if let Some(path) = &cli.checkpoint {
        config.logging.checkpoint = Some(path.clone());
    }

    let _guard = init_logging(&cli, &config)?;

    if cli.show_config {
        show_config(&cli, &config)?;
        return Ok(());
    }

    let mut fatal = false;
    for issue in config.validate() {
        if issue.is_fatal() {
            tracing::error!("Configuration error: {}", issue);
            fatal = true;
        } else {
            warn!("Configuration warning: {}", issue);
        }
    }
    if fatal {
        bail!("Invalid configuration (run with --show-config to see where it was loaded from)");
    }

    let input = build_input(&cli, &config)?;

    // === Dependency Injection ===
    let mut pool = BackendPool::new(&config)?;
    let orchestrator_backend = pool.backend(config.orchestrator.model.as_deref())?;
    let participants = pool.participants()?;

    let cancellation = CancellationToken::new();
    let interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping the run");
            interrupt.cancel();
        }
    });

    let mut use_case = RunTeamUseCase::new(orchestrator_backend, participants)
        .with_params(config.orchestrator.to_params())
        .with_orchestrator_name(config.orchestrator.name.clone())
        .with_cancellation(cancellation);

    if let Some(failures) = config.orchestrator.bench_after_failures {
        use_case = use_case.with_bench_policy(Arc::new(BenchAfterFailures(failures)));
    }
    if let Some(path) = &config.logging.conversation_log {
        let logger = open_conversation_log(path, cli.resume)?;
        info!("Conversation log: {}", logger.path().display());
        use_case = use_case.with_conversation_logger(Arc::new(logger));
    }
    if let Some(path) = &config.logging.checkpoint {
        use_case = use_case.with_checkpoint(Arc::new(JsonFileCheckpoint::new(path.clone())));
    }

    let reporter = (!cli.quiet && std::io::stderr().is_terminal()).then(ProgressReporter::new);
    let reporter = reporter.map(Arc::new);
    if let Some(reporter) = &reporter {
        use_case = use_case.with_progress(reporter.clone() as Arc<dyn OrchestrationProgress>);
    } else if !cli.quiet {
        use_case = use_case.with_progress(Arc::new(SimpleProgress));
    }

    let result = use_case.execute(input).await;
    if let Some(reporter) = &reporter {
        reporter.finish();
    }

    match result {
        Ok(output) => print_output(&cli, &output),
        Err(e) if e.is_cancelled() => {
            if let Some(path) = &config.logging.checkpoint {
                eprintln!(
                    "Interrupted. Resume with: hypoloop --checkpoint {} --resume",
                    path.display()
                );
            }
            std::process::exit(EXIT_INTERRUPTED);
        }
        Err(e) => Err(e).context("Run failed"),
    }
}

/// Set up stderr logging and, when configured, a plain-text log file.
///
/// `-v` flags win over `RUST_LOG`, which wins over `[logging] filter`.
fn init_logging(cli: &Cli, config: &FileConfig) -> Result<Option<WorkerGuard>> {
    let filter = match cli.verbosity_filter() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(config.logging.filter.as_deref().unwrap_or("warn"))
        }),
    };

    let stderr_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let Some(path) = &config.logging.log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        return Ok(None);
    };

    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", path.display()))?;
    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory {}", directory.display()))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Ok(Some(guard))
}

fn show_config(cli: &Cli, config: &FileConfig) -> Result<()> {
    println!("{}", "Configuration sources (highest priority first):".bold());
    if cli.no_config {
        println!("  (config files disabled by --no-config)");
    } else {
        for source in ConfigLoader::describe_sources(cli.config.as_deref()) {
            println!("  {}", source);
        }
    }
    println!();

    let mut shown = config.clone();
    if shown.provider.api_key.is_some() {
        shown.provider.api_key = Some("<redacted>".to_string());
    }
    println!("{}", "Effective configuration:".bold());
    println!("{}", toml::to_string_pretty(&shown).context("Failed to render configuration")?);
    Ok(())
}

fn build_input(cli: &Cli, config: &FileConfig) -> Result<RunTeamInput> {
    if !cli.resume {
        return match &cli.question {
            Some(question) => Ok(RunTeamInput::new(question.clone())),
            None => bail!("A question is required (or --resume with --checkpoint)"),
        };
    }

    if cli.question.is_some() {
        warn!("Ignoring the question: --resume continues the saved run");
    }
    let Some(path) = &config.logging.checkpoint else {
        bail!("--resume needs a checkpoint file");
    };
    let snapshot = JsonFileCheckpoint::new(path.clone())
        .load()
        .with_context(|| format!("Failed to read checkpoint {}", path.display()))?
        .with_context(|| format!("No checkpoint found at {}", path.display()))?;
    info!(
        "Resuming from {} ({} turns so far)",
        path.display(),
        snapshot.n_rounds
    );
    Ok(RunTeamInput::resume(snapshot))
}

fn open_conversation_log(path: &Path, resume: bool) -> Result<JsonlConversationLogger> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let logger = if resume {
        JsonlConversationLogger::append(path)
    } else {
        JsonlConversationLogger::create(path)
    }
    .with_context(|| format!("Failed to open conversation log {}", path.display()))?;
    let run_id = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
    Ok(logger.with_run_id(run_id))
}

fn print_output(cli: &Cli, output: &RunTeamOutput) -> Result<()> {
    if cli.json {
        let json = serde_json::json!({
            "final_answer": output.final_answer,
            "finish_reason": output.finish_reason,
            "rounds": output.snapshot.n_rounds,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    match &output.final_answer {
        Some(answer) => {
            println!("{}", answer.result);
            if !answer.is_complete() {
                eprintln!();
                eprintln!(
                    "{} {}",
                    "Incomplete:".yellow().bold(),
                    answer
                        .failure_reason
                        .as_deref()
                        .unwrap_or(&output.finish_reason)
                );
            }
        }
        None => eprintln!(
            "{} {}",
            "No answer:".red().bold(),
            output.finish_reason
        ),
    }
    Ok(())
}
