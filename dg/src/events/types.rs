//! Event types for approval loop activity
//!
//! Every observable step of a run: drafts, critiques, review requests,
//! human decisions, output and status changes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::{HumanReviewRequest, RequestId};

/// Lifecycle of a workflow run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    NotStarted,
    InProgress,
    /// Suspended on one or more human review requests
    IdleWithPendingRequests,
    Idle,
    Completed,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::NotStarted => "not-started",
            RunState::InProgress => "in-progress",
            RunState::IdleWithPendingRequests => "idle-with-pending-requests",
            RunState::Idle => "idle",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Workflow event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowEvent {
    /// The writer received the initial task
    RunStarted { run_id: String, task: String },

    /// The draft store captured a new draft, tagged with its review round
    DraftCaptured {
        run_id: String,
        iteration: u32,
        draft: String,
    },

    /// The reviewer critiqued the current draft
    CritiqueReceived {
        run_id: String,
        iteration: u32,
        critique: String,
    },

    /// The run is suspended waiting for a human reply
    RequestInfo {
        run_id: String,
        request_id: RequestId,
        request: HumanReviewRequest,
    },

    /// A human reply reached the controller
    DecisionReceived {
        run_id: String,
        request_id: RequestId,
        approved: bool,
    },

    /// The writer was sent back to revise
    Revising {
        run_id: String,
        iteration: u32,
        instructions: String,
    },

    /// Approved content
    Output { run_id: String, output: String },

    Status { run_id: String, state: RunState },

    Error {
        run_id: String,
        node: String,
        message: String,
    },
}

impl WorkflowEvent {
    /// Get the run ID for this event
    pub fn run_id(&self) -> &str {
        match self {
            WorkflowEvent::RunStarted { run_id, .. }
            | WorkflowEvent::DraftCaptured { run_id, .. }
            | WorkflowEvent::CritiqueReceived { run_id, .. }
            | WorkflowEvent::RequestInfo { run_id, .. }
            | WorkflowEvent::DecisionReceived { run_id, .. }
            | WorkflowEvent::Revising { run_id, .. }
            | WorkflowEvent::Output { run_id, .. }
            | WorkflowEvent::Status { run_id, .. }
            | WorkflowEvent::Error { run_id, .. } => run_id,
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            WorkflowEvent::RunStarted { .. } => "RunStarted",
            WorkflowEvent::DraftCaptured { .. } => "DraftCaptured",
            WorkflowEvent::CritiqueReceived { .. } => "CritiqueReceived",
            WorkflowEvent::RequestInfo { .. } => "RequestInfo",
            WorkflowEvent::DecisionReceived { .. } => "DecisionReceived",
            WorkflowEvent::Revising { .. } => "Revising",
            WorkflowEvent::Output { .. } => "Output",
            WorkflowEvent::Status { .. } => "Status",
            WorkflowEvent::Error { .. } => "Error",
        }
    }

    /// True for events after which the run accepts no more work
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            WorkflowEvent::Status {
                state: RunState::Completed | RunState::Failed,
                ..
            }
        )
    }
}

/// A timestamped event log entry for file persistence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub event: WorkflowEvent,
}

impl EventLogEntry {
    /// Create a new log entry with current timestamp
    pub fn new(event: WorkflowEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> HumanReviewRequest {
        HumanReviewRequest {
            prompt: "approve?".to_string(),
            draft: "Drive Bold.".to_string(),
            critique: "too short".to_string(),
            iteration: 1,
        }
    }

    #[test]
    fn test_event_run_id() {
        let event = WorkflowEvent::RunStarted {
            run_id: "run-123".to_string(),
            task: "write a slogan".to_string(),
        };
        assert_eq!(event.run_id(), "run-123");
        assert_eq!(event.event_type(), "RunStarted");
    }

    #[test]
    fn test_event_serialization() {
        let event = WorkflowEvent::RequestInfo {
            run_id: "run-123".to_string(),
            request_id: RequestId::from("req-1"),
            request: request(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"RequestInfo\""));
        assert!(json.contains("\"request_id\":\"req-1\""));
        assert!(json.contains("Drive Bold."));

        let parsed: WorkflowEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        let event = WorkflowEvent::Status {
            run_id: "r".to_string(),
            state: RunState::IdleWithPendingRequests,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("idle-with-pending-requests"));
        assert_eq!(RunState::IdleWithPendingRequests.to_string(), "idle-with-pending-requests");
    }

    #[test]
    fn test_is_final() {
        let done = WorkflowEvent::Status {
            run_id: "r".to_string(),
            state: RunState::Completed,
        };
        let idle = WorkflowEvent::Status {
            run_id: "r".to_string(),
            state: RunState::Idle,
        };
        let output = WorkflowEvent::Output {
            run_id: "r".to_string(),
            output: "x".to_string(),
        };
        assert!(done.is_final());
        assert!(!idle.is_final());
        assert!(!output.is_final());
    }

    #[test]
    fn test_event_log_entry() {
        let entry = EventLogEntry::new(WorkflowEvent::Output {
            run_id: "run-123".to_string(),
            output: "Drive Bold.".to_string(),
        });

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"ts\""));
        assert!(json.contains("Output"));
    }

    #[test]
    fn test_all_event_types_have_run_id() {
        let run_id = "run-test";
        let events = vec![
            WorkflowEvent::RunStarted {
                run_id: run_id.to_string(),
                task: "t".to_string(),
            },
            WorkflowEvent::DraftCaptured {
                run_id: run_id.to_string(),
                iteration: 1,
                draft: "d".to_string(),
            },
            WorkflowEvent::CritiqueReceived {
                run_id: run_id.to_string(),
                iteration: 1,
                critique: "c".to_string(),
            },
            WorkflowEvent::RequestInfo {
                run_id: run_id.to_string(),
                request_id: RequestId::from("req"),
                request: request(),
            },
            WorkflowEvent::DecisionReceived {
                run_id: run_id.to_string(),
                request_id: RequestId::from("req"),
                approved: false,
            },
            WorkflowEvent::Revising {
                run_id: run_id.to_string(),
                iteration: 1,
                instructions: "i".to_string(),
            },
            WorkflowEvent::Output {
                run_id: run_id.to_string(),
                output: "o".to_string(),
            },
            WorkflowEvent::Status {
                run_id: run_id.to_string(),
                state: RunState::Idle,
            },
            WorkflowEvent::Error {
                run_id: run_id.to_string(),
                node: "writer".to_string(),
                message: "boom".to_string(),
            },
        ];

        for event in events {
            assert_eq!(event.run_id(), run_id, "{}", event.event_type());
        }
    }
}
