//! Console operator: shows each review request and reads one reply line

use std::io::{self, Write};

use async_trait::async_trait;
use colored::Colorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tracing::debug;

use super::driver::HumanResponder;
use super::engine::WorkflowError;
use super::messages::{HumanReviewRequest, RequestId};
use crate::events::WorkflowEvent;

pub struct ConsoleResponder<R, W> {
    reader: R,
    writer: W,
}

impl ConsoleResponder<BufReader<Stdin>, io::Stdout> {
    /// Read replies from stdin, print to stdout
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), io::stdout())
    }
}

impl<R, W> ConsoleResponder<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<R, W: Write> ConsoleResponder<R, W> {
    fn show(&mut self, request: &HumanReviewRequest) -> io::Result<()> {
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "{}",
            format!("=== Review request (iteration {}) ===", request.iteration)
                .bright_cyan()
                .bold()
        )?;
        writeln!(self.writer, "{}", "Draft:".green().bold())?;
        writeln!(self.writer, "{}", request.draft)?;
        writeln!(self.writer, "{}", "Reviewer feedback:".yellow().bold())?;
        writeln!(self.writer, "{}", request.critique)?;
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", request.prompt)?;
        write!(self.writer, "> ")?;
        self.writer.flush()
    }
}

#[async_trait]
impl<R, W> HumanResponder for ConsoleResponder<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    async fn respond(&mut self, id: &RequestId, request: &HumanReviewRequest) -> Result<String, WorkflowError> {
        debug!(request_id = %id, iteration = request.iteration, "ConsoleResponder::respond: called");
        self.show(request)?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed before a reply was entered").into());
        }
        Ok(line.trim().to_string())
    }

    fn observe(&mut self, event: &WorkflowEvent) {
        let result = match event {
            WorkflowEvent::Revising { instructions, .. } if instructions.is_empty() => {
                writeln!(self.writer, "{}", "Revising with no extra instructions...".dimmed())
            }
            WorkflowEvent::Revising { .. } => writeln!(self.writer, "{}", "Revising...".dimmed()),
            WorkflowEvent::DecisionReceived { approved: true, .. } => {
                writeln!(self.writer, "{}", "Approved.".bright_green())
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            debug!(error = %e, "ConsoleResponder::observe: write failed");
        }
    }
}
