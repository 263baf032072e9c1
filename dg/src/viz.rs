//! Workflow diagram export
//!
//! Emits Graphviz DOT for the approval loop and optionally renders SVG by
//! piping it through the `dot` binary.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::DiagramFormat;
use crate::workflow::node;

#[derive(Debug, Error)]
pub enum VizError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Graphviz 'dot' binary not found; install graphviz or export with --format dot")]
    DotNotFound,

    #[error("dot exited with status {status}: {stderr}")]
    DotFailed { status: i32, stderr: String },
}

/// Directed edge between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: &'static str,
    pub to: &'static str,
    pub label: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    name: String,
    start: &'static str,
    nodes: Vec<&'static str>,
    edges: Vec<Edge>,
}

impl WorkflowGraph {
    /// The writer/reviewer/human approval loop
    pub fn approval_loop() -> Self {
        let edge = |from, to, label| Edge { from, to, label };
        Self {
            name: "HumanInTheLoop_Workflow".to_string(),
            start: node::WRITER,
            nodes: node::ALL.to_vec(),
            edges: vec![
                edge(node::WRITER, node::DRAFT_CAPTURE, None),
                edge(node::DRAFT_CAPTURE, node::REVIEWER, None),
                edge(node::REVIEWER, node::REVIEW_COORDINATOR, None),
                edge(node::REVIEW_COORDINATOR, node::REQUEST_INFO, Some("review request")),
                edge(node::REQUEST_INFO, node::REVIEW_COORDINATOR, Some("decision")),
                edge(node::REVIEW_COORDINATOR, node::WRITER, Some("revise")),
            ],
        }
    }

    pub fn nodes(&self) -> &[&'static str] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn start(&self) -> &'static str {
        self.start
    }

    /// Render as Graphviz DOT
    pub fn to_dot(&self) -> String {
        debug!(name = %self.name, "WorkflowGraph::to_dot: called");
        let mut out = String::new();
        let _ = writeln!(out, "digraph \"{}\" {{", self.name);
        let _ = writeln!(out, "  rankdir=TB;");
        let _ = writeln!(out, "  node [shape=box, style=rounded];");
        for n in &self.nodes {
            if *n == self.start {
                let _ = writeln!(out, "  \"{}\" [style=\"rounded,filled\", fillcolor=lightgreen];", n);
            } else {
                let _ = writeln!(out, "  \"{}\";", n);
            }
        }
        for e in &self.edges {
            match e.label {
                Some(label) => {
                    let _ = writeln!(out, "  \"{}\" -> \"{}\" [label=\"{}\"];", e.from, e.to, label);
                }
                None => {
                    let _ = writeln!(out, "  \"{}\" -> \"{}\";", e.from, e.to);
                }
            }
        }
        out.push_str("}\n");
        out
    }

    /// Write the diagram to `base` with the extension for `format`
    ///
    /// Returns the path written.
    pub async fn export(&self, base: impl AsRef<Path>, format: DiagramFormat) -> Result<PathBuf, VizError> {
        let path = base.as_ref().with_extension(format.extension());
        debug!(?path, ?format, "WorkflowGraph::export: called");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let dot = self.to_dot();
        match format {
            DiagramFormat::Dot => tokio::fs::write(&path, dot).await?,
            DiagramFormat::Svg => {
                let svg = render_svg(&dot).await?;
                tokio::fs::write(&path, svg).await?;
            }
        }

        info!(?path, "Workflow diagram exported");
        Ok(path)
    }
}

async fn render_svg(dot: &str) -> Result<Vec<u8>, VizError> {
    debug!("render_svg: called");
    let mut child = match Command::new("dot")
        .arg("-Tsvg")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(VizError::DotNotFound),
        Err(e) => return Err(e.into()),
    };

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(dot.as_bytes()).await?;
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        return Err(VizError::DotFailed {
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}

/// Export the diagram, logging instead of failing
pub async fn export_or_warn(graph: &WorkflowGraph, base: impl AsRef<Path>, format: DiagramFormat) -> Option<PathBuf> {
    match graph.export(base, format).await {
        Ok(path) => Some(path),
        Err(e) => {
            warn!(error = %e, "Workflow diagram export failed; continuing");
            None
        }
    }
}
