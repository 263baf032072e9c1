//! dg - writer/reviewer approval loop CLI

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use draftgate::agent::{AgentPair, build_agent};
use draftgate::cli::{Cli, Command};
use draftgate::config::{Config, DiagramFormat, ResumeMode};
use draftgate::events::{EventBus, EventLogger, spawn_event_logger};
use draftgate::llm::create_client;
use draftgate::prompts::PromptLoader;
use draftgate::viz::{WorkflowGraph, export_or_warn};
use draftgate::workflow::{ApprovalDriver, ConsoleResponder, Workflow};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("draftgate")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("draftgate.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine; the variables may already be exported
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(e) if e.not_found() => {}
        Err(e) => return Err(e).context("Failed to load .env file"),
    }

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Run { task, mode, no_diagram }) => cmd_run(&config, task, mode, no_diagram).await,
        None => cmd_run(&config, None, None, false).await,
        Some(Command::Graph { output, format }) => cmd_graph(&config, output, format).await,
        Some(Command::Config) => cmd_config(&config),
    }
}

/// Run the approval loop with the console as the human reviewer
async fn cmd_run(config: &Config, task: Option<String>, mode: Option<ResumeMode>, no_diagram: bool) -> Result<()> {
    debug!(?task, ?mode, no_diagram, "cmd_run: called");
    config.validate()?;

    let llm = config.resolve_llm()?;
    info!(?llm, "LLM configured");
    let client = create_client(&llm).context("Failed to create LLM client")?;

    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    let templates = PromptLoader::new(&cwd).compile()?;

    let writer = build_agent(
        &config.writer,
        &config.llm,
        "Writer",
        templates.writer_instructions().context("Failed to render writer instructions")?,
        Arc::clone(&client),
    );
    let reviewer = build_agent(
        &config.reviewer,
        &config.llm,
        "Reviewer",
        templates.reviewer_instructions().context("Failed to render reviewer instructions")?,
        client,
    );

    if config.diagram.enabled && !no_diagram {
        let graph = WorkflowGraph::approval_loop();
        if let Some(path) = export_or_warn(&graph, &config.diagram.path, config.diagram.format).await {
            println!("{} {}", "Workflow diagram saved to".dimmed(), path.display());
        }
    }

    let bus = EventBus::with_default_capacity();
    let logger = if config.workflow.event_log {
        Some(spawn_event_logger(&bus, EventLogger::default_runs_dir()?)?)
    } else {
        None
    };

    let mut workflow = Workflow::new(AgentPair::new(writer, reviewer), templates)?.with_events(&bus);
    let task = task.unwrap_or_else(|| config.workflow.task.clone());
    let driver = ApprovalDriver::new(mode.unwrap_or(config.workflow.mode));
    let mut console = ConsoleResponder::stdio();

    println!("{}", "Writer-Reviewer human-in-the-loop workflow".bright_cyan().bold());
    println!("{} {}", "Task:".bold(), task);

    let result = driver.drive(&mut workflow, &task, &mut console).await;
    let run_id = workflow.run_id().to_string();

    // Close the channel so the logger drains and exits
    drop(workflow);
    drop(bus);
    if let Some(handle) = logger {
        if let Err(e) = handle.await {
            warn!(error = %e, "cmd_run: event logger task failed");
        }
    }

    let transient = matches!(&result, Err(e) if e.is_transient());
    let output = result.with_context(|| {
        let hint = if transient { " (transient, try again)" } else { "" };
        format!("Run {} failed{}", run_id, hint)
    })?;
    println!();
    println!("{}", "=== Final output ===".bright_green().bold());
    println!("{}", output.into_inner());
    Ok(())
}

/// Export the workflow diagram
async fn cmd_graph(config: &Config, output: Option<PathBuf>, format: Option<DiagramFormat>) -> Result<()> {
    debug!(?output, ?format, "cmd_graph: called");
    let base = output.unwrap_or_else(|| config.diagram.path.clone());
    let format = format.unwrap_or(config.diagram.format);

    let path = WorkflowGraph::approval_loop()
        .export(&base, format)
        .await
        .context("Failed to export workflow diagram")?;
    println!("{}", path.display());
    Ok(())
}

/// Print the effective configuration
fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    print!("{}", serde_yaml::to_string(config).context("Failed to serialize config")?);
    Ok(())
}
