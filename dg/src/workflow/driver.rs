//! Approval driver - alternates between running the workflow and collecting
//! human replies until the run produces output

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::engine::{Workflow, WorkflowError};
use super::messages::{FinalOutput, HumanReviewRequest, RequestId};
use crate::config::ResumeMode;
use crate::events::WorkflowEvent;

/// Source of human replies
#[async_trait]
pub trait HumanResponder: Send {
    /// Reply to one review request: `approve` or revision instructions
    async fn respond(&mut self, id: &RequestId, request: &HumanReviewRequest) -> Result<String, WorkflowError>;

    /// Sees every event the workflow produced, in order
    fn observe(&mut self, _event: &WorkflowEvent) {}
}

pub struct ApprovalDriver {
    mode: ResumeMode,
}

impl ApprovalDriver {
    pub fn new(mode: ResumeMode) -> Self {
        debug!(?mode, "ApprovalDriver::new: called");
        Self { mode }
    }

    pub fn mode(&self) -> ResumeMode {
        self.mode
    }

    /// Run `workflow` on `task` until a draft is approved
    ///
    /// A phase that ends with neither output nor pending requests is an error.
    pub async fn drive(
        &self,
        workflow: &mut Workflow,
        task: &str,
        responder: &mut dyn HumanResponder,
    ) -> Result<FinalOutput, WorkflowError> {
        debug!(mode = ?self.mode, "ApprovalDriver::drive: called");
        let mut events = workflow.run(task).await?;

        loop {
            for event in &events {
                responder.observe(event);
            }

            if let Some(output) = workflow.output() {
                info!(run_id = workflow.run_id(), "Approval loop finished");
                return Ok(output.clone());
            }

            let pending = workflow.pending_requests();
            if pending.is_empty() {
                warn!(run_id = workflow.run_id(), "Workflow idle without output or pending requests");
                return Err(WorkflowError::Stalled);
            }

            events = match self.mode {
                ResumeMode::Batch => {
                    let mut responses = Vec::with_capacity(pending.len());
                    for p in &pending {
                        let reply = responder.respond(&p.id, &p.request).await?;
                        responses.push((p.id.clone(), reply));
                    }
                    workflow.send_responses(responses).await?
                }
                ResumeMode::Immediate => {
                    let first = &pending[0];
                    let reply = responder.respond(&first.id, &first.request).await?;
                    workflow.resolve(&first.id, reply)?;
                    workflow.resume().await?
                }
            };
        }
    }
}
