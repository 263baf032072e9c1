//! Approval loop: writer → draft capture → reviewer → human gate
//!
//! [`Workflow`] owns one run. The [`ApprovalController`] decides between
//! completion and revision; the [`HumanGate`] holds review requests until a
//! reply arrives; [`ApprovalDriver`] feeds replies back in batch or
//! immediate mode.

mod console;
mod controller;
mod driver;
mod engine;
mod gate;
mod messages;
mod relay;
mod store;

pub use console::ConsoleResponder;
pub use controller::{ApprovalController, ControllerError, ControllerState, Transition};
pub use driver::{ApprovalDriver, HumanResponder};
pub use engine::{Workflow, WorkflowError};
pub use gate::{GateError, HumanGate, PendingRequest};
pub use messages::{
    APPROVE_TOKEN, AgentCall, CritiqueRequest, FinalOutput, HumanDecision, HumanReviewRequest, RequestId, ReviewCycle,
    WorkflowMessage, is_approval,
};
pub use relay::CritiqueRelay;
pub use store::DraftStore;

/// Graph node ids
pub mod node {
    pub const WRITER: &str = "writer";
    pub const DRAFT_CAPTURE: &str = "draft_capture";
    pub const REVIEWER: &str = "reviewer";
    pub const REVIEW_COORDINATOR: &str = "review_coordinator";
    pub const REQUEST_INFO: &str = "request_info";

    /// Every node, in graph order
    pub const ALL: [&str; 5] = [WRITER, DRAFT_CAPTURE, REVIEWER, REVIEW_COORDINATOR, REQUEST_INFO];
}
