//! Approval Loop Controller - the state machine at the center of the loop
//!
//! ```text
//!              DraftReady / CritiqueReady
//!                 ┌──────────────┐
//!                 ▼              │
//!        ┌──────────────────┐    │
//!  ────► │ AwaitingCritique │ ───┘
//!        └──────────────────┘
//!           ▲            │ CritiqueReady (request sent to the gate)
//!  revise   │            ▼
//!        ┌──────────────────┐  approve   ┌──────────┐
//!        │  AwaitingHuman   │ ─────────► │ Approved │
//!        └──────────────────┘            └──────────┘
//! ```

use std::fmt;

use handlebars::RenderError;
use thiserror::Error;
use tracing::{debug, info};

use super::gate::HumanGate;
use super::messages::{FinalOutput, HumanDecision, HumanReviewRequest, RequestId, ReviewCycle};
use super::relay::CritiqueRelay;
use super::store::DraftStore;
use crate::prompts::{RevisionContext, Templates};

/// Controller states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    /// Waiting for a draft and its critique
    AwaitingCritique,
    /// A review request is open at the gate
    AwaitingHuman { request_id: RequestId },
    /// Terminal
    Approved,
}

impl ControllerState {
    pub fn name(&self) -> &'static str {
        match self {
            ControllerState::AwaitingCritique => "AwaitingCritique",
            ControllerState::AwaitingHuman { .. } => "AwaitingHuman",
            ControllerState::Approved => "Approved",
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a human decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The current draft was approved
    Approved(FinalOutput),
    /// The writer must revise; the controller is back in `AwaitingCritique`
    Revise { prompt: String, instructions: String },
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Unexpected {message} while {state}")]
    UnexpectedMessage { state: &'static str, message: &'static str },

    #[error("Decision for request {got} does not match open request {expected}")]
    RequestMismatch { expected: RequestId, got: RequestId },

    #[error("Failed to render prompt: {0}")]
    Prompt(#[from] RenderError),
}

pub struct ApprovalController {
    state: ControllerState,
    store: DraftStore,
    relay: CritiqueRelay,
    templates: Templates,
    cycle: Option<ReviewCycle>,
}

impl ApprovalController {
    pub fn new(templates: Templates) -> Result<Self, ControllerError> {
        debug!("ApprovalController::new: called");
        Ok(Self {
            state: ControllerState::AwaitingCritique,
            store: DraftStore::new(),
            relay: CritiqueRelay::new(templates.clone())?,
            templates,
            cycle: None,
        })
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn store(&self) -> &DraftStore {
        &self.store
    }

    /// The most recent critique round
    pub fn cycle(&self) -> Option<&ReviewCycle> {
        self.cycle.as_ref()
    }

    fn unexpected(&self, message: &'static str) -> ControllerError {
        ControllerError::UnexpectedMessage {
            state: self.state.name(),
            message,
        }
    }

    /// Capture a new draft; returns the prompt for the critic
    pub fn on_draft(&mut self, draft: impl Into<String>) -> Result<String, ControllerError> {
        if self.state != ControllerState::AwaitingCritique {
            return Err(self.unexpected("DraftReady"));
        }
        let request = self.store.capture(draft);
        debug!(draft_len = request.draft.len(), "ApprovalController::on_draft: captured");
        Ok(self.relay.review_prompt(&request)?)
    }

    /// Attach a critique and open a review request at the gate
    pub fn on_critique(
        &mut self,
        critique: impl Into<String>,
        gate: &mut HumanGate,
    ) -> Result<(RequestId, HumanReviewRequest), ControllerError> {
        if self.state != ControllerState::AwaitingCritique {
            return Err(self.unexpected("CritiqueReady"));
        }

        let (cycle, request) = self.relay.relay(&mut self.store, critique);
        let request_id = gate.ask(request.clone());
        info!(%request_id, iteration = cycle.iteration, "Awaiting human decision");

        self.cycle = Some(cycle);
        self.state = ControllerState::AwaitingHuman {
            request_id: request_id.clone(),
        };
        Ok((request_id, request))
    }

    /// Apply a human decision: approve or send the writer back to work
    pub fn on_decision(&mut self, decision: &HumanDecision) -> Result<Transition, ControllerError> {
        let expected = match &self.state {
            ControllerState::AwaitingHuman { request_id } => request_id.clone(),
            _ => return Err(self.unexpected("HumanDecisionReady")),
        };
        if decision.request_id != expected {
            return Err(ControllerError::RequestMismatch {
                expected,
                got: decision.request_id.clone(),
            });
        }

        if decision.is_approval() {
            info!(iteration = self.store.iteration(), "Draft approved");
            self.state = ControllerState::Approved;
            return Ok(Transition::Approved(FinalOutput(self.store.draft().to_string())));
        }

        let critique = self.cycle.as_ref().map(|c| c.critique.as_str()).unwrap_or("");
        let instructions = decision.instructions();
        let prompt = self.templates.revision(&RevisionContext {
            draft: self.store.draft(),
            critique,
            instructions,
        })?;

        info!(iteration = self.store.iteration(), "Revision requested");
        self.state = ControllerState::AwaitingCritique;
        Ok(Transition::Revise {
            prompt,
            instructions: instructions.to_string(),
        })
    }
}
