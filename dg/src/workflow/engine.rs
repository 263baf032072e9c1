//! Workflow engine - routes messages between the approval loop's nodes
//!
//! One run owns its agents, controller and gate. Work items are processed
//! one at a time from a FIFO queue until the queue drains; the run then
//! either has output, is suspended on pending review requests, or is idle.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::controller::{ApprovalController, ControllerError, ControllerState, Transition};
use super::gate::{GateError, HumanGate, PendingRequest};
use super::messages::{AgentCall, FinalOutput, RequestId, WorkflowMessage};
use super::node;
use crate::agent::AgentPair;
use crate::events::{EventBus, EventEmitter, RunState, WorkflowEvent};
use crate::llm::LlmError;
use crate::prompts::Templates;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Agent {node} failed: {source}")]
    Agent {
        node: &'static str,
        #[source]
        source: LlmError,
    },

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error("Run already started")]
    AlreadyStarted,

    #[error("Run has not started")]
    NotStarted,

    #[error("Run already completed")]
    Completed,

    #[error("Run failed and accepts no more work")]
    RunFailed,

    #[error("Duplicate response for request {0}")]
    DuplicateResponse(RequestId),

    #[error("Run went idle with no pending requests and no output")]
    Stalled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkflowError {
    /// An agent call failed in a way a fresh run may not hit
    pub fn is_transient(&self) -> bool {
        matches!(self, WorkflowError::Agent { source, .. } if source.is_retryable())
    }
}

/// Queued unit of work
#[derive(Debug)]
enum Work {
    Call(AgentCall),
    Message(WorkflowMessage),
}

pub struct Workflow {
    run_id: String,
    agents: AgentPair,
    controller: ApprovalController,
    gate: HumanGate,
    queue: VecDeque<Work>,
    state: RunState,
    output: Option<FinalOutput>,
    emitter: Option<EventEmitter>,
}

impl Workflow {
    pub fn new(agents: AgentPair, templates: Templates) -> Result<Self, WorkflowError> {
        let run_id = Uuid::now_v7().to_string();
        debug!(%run_id, "Workflow::new: called");
        Ok(Self {
            run_id,
            agents,
            controller: ApprovalController::new(templates)?,
            gate: HumanGate::new(),
            queue: VecDeque::new(),
            state: RunState::NotStarted,
            output: None,
            emitter: None,
        })
    }

    /// Also publish every event on `bus`
    pub fn with_events(mut self, bus: &EventBus) -> Self {
        self.emitter = Some(bus.emitter_for(self.run_id.clone()));
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn controller_state(&self) -> &ControllerState {
        self.controller.state()
    }

    /// Current draft and iteration
    pub fn current(&self) -> (&str, u32) {
        self.controller.store().current()
    }

    pub fn output(&self) -> Option<&FinalOutput> {
        self.output.as_ref()
    }

    pub fn pending_requests(&self) -> Vec<PendingRequest> {
        self.gate.pending()
    }

    /// Start the run: the task goes to the writer verbatim
    pub async fn run(&mut self, task: impl Into<String>) -> Result<Vec<WorkflowEvent>, WorkflowError> {
        if self.state != RunState::NotStarted {
            return Err(WorkflowError::AlreadyStarted);
        }
        let task = task.into();
        info!(run_id = %self.run_id, "Workflow run started");

        let mut events = Vec::new();
        self.emit(
            &mut events,
            WorkflowEvent::RunStarted {
                run_id: self.run_id.clone(),
                task: task.clone(),
            },
        );
        self.queue.push_back(Work::Call(AgentCall::Draft { prompt: task }));
        self.pump(&mut events).await?;
        Ok(events)
    }

    /// Answer one pending request without resuming
    pub fn resolve(&mut self, id: &RequestId, reply: impl Into<String>) -> Result<(), WorkflowError> {
        debug!(request_id = %id, "Workflow::resolve: called");
        self.ensure_runnable()?;
        let decision = self.gate.resolve(id, reply)?;
        self.queue
            .push_back(Work::Message(WorkflowMessage::HumanDecisionReady(decision)));
        Ok(())
    }

    /// Process queued work until the run suspends or finishes
    pub async fn resume(&mut self) -> Result<Vec<WorkflowEvent>, WorkflowError> {
        debug!(queued = self.queue.len(), "Workflow::resume: called");
        self.ensure_runnable()?;
        let mut events = Vec::new();
        self.pump(&mut events).await?;
        Ok(events)
    }

    /// Answer a batch of requests, then resume
    ///
    /// Every id is checked before any is applied; one bad id rejects the
    /// whole batch.
    pub async fn send_responses(
        &mut self,
        responses: Vec<(RequestId, String)>,
    ) -> Result<Vec<WorkflowEvent>, WorkflowError> {
        debug!(count = responses.len(), "Workflow::send_responses: called");
        self.ensure_runnable()?;

        let mut seen = HashSet::new();
        for (id, _) in &responses {
            if !seen.insert(id) {
                return Err(WorkflowError::DuplicateResponse(id.clone()));
            }
            self.gate.check(id)?;
        }

        for (id, reply) in responses {
            self.resolve(&id, reply)?;
        }
        self.resume().await
    }

    fn ensure_runnable(&self) -> Result<(), WorkflowError> {
        match self.state {
            RunState::NotStarted => Err(WorkflowError::NotStarted),
            RunState::Completed => Err(WorkflowError::Completed),
            RunState::Failed => Err(WorkflowError::RunFailed),
            _ => Ok(()),
        }
    }

    async fn pump(&mut self, events: &mut Vec<WorkflowEvent>) -> Result<(), WorkflowError> {
        self.set_state(RunState::InProgress, events);

        while let Some(work) = self.queue.pop_front() {
            match work {
                Work::Call(call) => {
                    let message = self.call_agent(call, events).await?;
                    self.queue.push_back(Work::Message(message));
                }
                Work::Message(message) => {
                    let target = route_target(&message);
                    if let Err(e) = self.dispatch(message, events) {
                        return Err(self.fail(target, e, events));
                    }
                }
            }
        }

        let state = if self.output.is_some() {
            RunState::Completed
        } else if self.gate.pending_count() > 0 {
            RunState::IdleWithPendingRequests
        } else {
            RunState::Idle
        };
        self.set_state(state, events);
        Ok(())
    }

    async fn call_agent(
        &mut self,
        call: AgentCall,
        events: &mut Vec<WorkflowEvent>,
    ) -> Result<WorkflowMessage, WorkflowError> {
        let (target, agent, prompt) = match call {
            AgentCall::Draft { prompt } => (node::WRITER, Arc::clone(&self.agents.writer), prompt),
            AgentCall::Critique { prompt } => (node::REVIEWER, Arc::clone(&self.agents.reviewer), prompt),
        };
        debug!(node = target, agent = agent.name(), prompt_len = prompt.len(), "Workflow::call_agent: called");

        let text = match agent.run(&prompt).await {
            Ok(text) => text,
            Err(source) => return Err(self.fail(target, WorkflowError::Agent { node: target, source }, events)),
        };

        Ok(if target == node::WRITER {
            WorkflowMessage::DraftReady { draft: text }
        } else {
            WorkflowMessage::CritiqueReady { critique: text }
        })
    }

    fn dispatch(&mut self, message: WorkflowMessage, events: &mut Vec<WorkflowEvent>) -> Result<(), WorkflowError> {
        debug!(kind = message.kind(), "Workflow::dispatch: called");
        match message {
            WorkflowMessage::DraftReady { draft } => {
                let prompt = self.controller.on_draft(draft.clone())?;
                // Tagged with the round this draft is critiqued in
                let iteration = self.controller.store().iteration() + 1;
                self.emit(
                    events,
                    WorkflowEvent::DraftCaptured {
                        run_id: self.run_id.clone(),
                        iteration,
                        draft,
                    },
                );
                self.queue.push_back(Work::Call(AgentCall::Critique { prompt }));
            }
            WorkflowMessage::CritiqueReady { critique } => {
                let (request_id, request) = self.controller.on_critique(critique.clone(), &mut self.gate)?;
                self.emit(
                    events,
                    WorkflowEvent::CritiqueReceived {
                        run_id: self.run_id.clone(),
                        iteration: request.iteration,
                        critique,
                    },
                );
                self.emit(
                    events,
                    WorkflowEvent::RequestInfo {
                        run_id: self.run_id.clone(),
                        request_id,
                        request,
                    },
                );
            }
            WorkflowMessage::HumanDecisionReady(decision) => {
                let transition = self.controller.on_decision(&decision)?;
                self.emit(
                    events,
                    WorkflowEvent::DecisionReceived {
                        run_id: self.run_id.clone(),
                        request_id: decision.request_id.clone(),
                        approved: matches!(transition, Transition::Approved(_)),
                    },
                );
                match transition {
                    Transition::Approved(output) => {
                        self.queue.push_back(Work::Message(WorkflowMessage::Terminal(output)));
                    }
                    Transition::Revise { prompt, instructions } => {
                        self.emit(
                            events,
                            WorkflowEvent::Revising {
                                run_id: self.run_id.clone(),
                                iteration: self.controller.store().iteration(),
                                instructions,
                            },
                        );
                        self.queue.push_back(Work::Call(AgentCall::Draft { prompt }));
                    }
                }
            }
            WorkflowMessage::Terminal(output) => {
                info!(run_id = %self.run_id, output_len = output.as_str().len(), "Workflow produced output");
                self.emit(
                    events,
                    WorkflowEvent::Output {
                        run_id: self.run_id.clone(),
                        output: output.as_str().to_string(),
                    },
                );
                self.output = Some(output);
            }
        }
        Ok(())
    }

    /// Mark the run failed and hand back the error
    fn fail(&mut self, target: &str, err: WorkflowError, events: &mut Vec<WorkflowEvent>) -> WorkflowError {
        error!(run_id = %self.run_id, node = target, error = %err, "Workflow run failed");
        self.queue.clear();
        self.emit(
            events,
            WorkflowEvent::Error {
                run_id: self.run_id.clone(),
                node: target.to_string(),
                message: err.to_string(),
            },
        );
        self.set_state(RunState::Failed, events);
        err
    }

    fn set_state(&mut self, state: RunState, events: &mut Vec<WorkflowEvent>) {
        if self.state == state {
            return;
        }
        debug!(from = %self.state, to = %state, "Workflow::set_state: called");
        self.state = state;
        self.emit(
            events,
            WorkflowEvent::Status {
                run_id: self.run_id.clone(),
                state,
            },
        );
    }

    fn emit(&self, events: &mut Vec<WorkflowEvent>, event: WorkflowEvent) {
        if let Some(emitter) = &self.emitter {
            emitter.emit(event.clone());
        }
        events.push(event);
    }
}

/// Node that handles `message`
fn route_target(message: &WorkflowMessage) -> &'static str {
    match message {
        WorkflowMessage::DraftReady { .. } => node::DRAFT_CAPTURE,
        WorkflowMessage::CritiqueReady { .. } | WorkflowMessage::Terminal(_) => node::REVIEW_COORDINATOR,
        WorkflowMessage::HumanDecisionReady(_) => node::REQUEST_INFO,
    }
}
