//! Message and state types for the approval loop

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reply token that approves the current draft
pub const APPROVE_TOKEN: &str = "approve";

/// True when `reply` is the approval token, ignoring case and surrounding whitespace
pub fn is_approval(reply: &str) -> bool {
    reply.trim().eq_ignore_ascii_case(APPROVE_TOKEN)
}

/// Correlation id minted by the Human Gate for each review request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Fresh time-ordered id
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Draft and critique for one critique round
///
/// `iteration` starts at 1 for the first critique and always matches the
/// draft the critique was written for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewCycle {
    pub draft: String,
    pub critique: String,
    pub iteration: u32,
}

/// Request shown to the human reviewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanReviewRequest {
    /// Fixed operator instruction
    pub prompt: String,
    pub draft: String,
    pub critique: String,
    pub iteration: u32,
}

/// The human's answer to one review request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanDecision {
    pub request_id: RequestId,
    pub reply: String,
}

impl HumanDecision {
    pub fn new(request_id: RequestId, reply: impl Into<String>) -> Self {
        Self {
            request_id,
            reply: reply.into(),
        }
    }

    pub fn is_approval(&self) -> bool {
        is_approval(&self.reply)
    }

    /// Revision instructions; empty for a blank reply
    pub fn instructions(&self) -> &str {
        self.reply.trim()
    }
}

/// The approved draft, produced once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalOutput(pub String);

impl FinalOutput {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Draft captured by the Draft Store, on its way to the critic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CritiqueRequest {
    pub draft: String,
}

/// Messages routed between workflow components
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowMessage {
    /// The writer produced a draft
    DraftReady { draft: String },

    /// The reviewer produced a critique of the current draft
    CritiqueReady { critique: String },

    /// A human decision arrived through the gate
    HumanDecisionReady(HumanDecision),

    /// The run finished with approved content
    Terminal(FinalOutput),
}

impl WorkflowMessage {
    /// Variant name for logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowMessage::DraftReady { .. } => "DraftReady",
            WorkflowMessage::CritiqueReady { .. } => "CritiqueReady",
            WorkflowMessage::HumanDecisionReady(_) => "HumanDecisionReady",
            WorkflowMessage::Terminal(_) => "Terminal",
        }
    }
}

/// Agent invocations queued by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentCall {
    /// Ask the writer for a new or revised draft
    Draft { prompt: String },

    /// Ask the reviewer to critique a draft
    Critique { prompt: String },
}
