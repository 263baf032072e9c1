//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{DiagramFormat, ResumeMode};

/// draftgate - writer/reviewer drafting with a human approval gate
#[derive(Debug, Parser)]
#[command(
    name = "dg",
    about = "Draft with an LLM writer, critique with an LLM reviewer, approve as a human",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute; defaults to `run`
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the approval loop with a console reviewer
    Run {
        /// Task for the writer (defaults to workflow.task from config)
        task: Option<String>,

        /// How replies are handed back: batch or immediate
        #[arg(short, long)]
        mode: Option<ResumeMode>,

        /// Skip the workflow diagram export
        #[arg(long)]
        no_diagram: bool,
    },

    /// Export the workflow diagram
    Graph {
        /// Output path without extension (defaults to diagram.path from config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Diagram format: svg or dot
        #[arg(short, long)]
        format: Option<DiagramFormat>,
    },

    /// Print the effective configuration
    Config,
}
