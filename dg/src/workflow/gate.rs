//! Human Gate - suspend/resume boundary for human review
//!
//! Every request the gate hands out stays pending until exactly one reply
//! resolves it. Several requests may be pending at once.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, info};

use super::messages::{HumanDecision, HumanReviewRequest, RequestId};

/// Correlation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("Unknown review request: {0}")]
    UnknownRequest(RequestId),

    #[error("Review request already resolved: {0}")]
    AlreadyResolved(RequestId),
}

/// A request waiting on a human reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub id: RequestId,
    pub request: HumanReviewRequest,
}

#[derive(Debug, Default)]
pub struct HumanGate {
    /// In the order they were asked
    pending: Vec<PendingRequest>,
    resolved: HashSet<RequestId>,
}

impl HumanGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request and return its correlation id
    pub fn ask(&mut self, request: HumanReviewRequest) -> RequestId {
        let id = RequestId::generate();
        info!(request_id = %id, iteration = request.iteration, "Human review requested");
        self.pending.push(PendingRequest {
            id: id.clone(),
            request,
        });
        id
    }

    /// Check that `id` can be resolved, without resolving it
    pub fn check(&self, id: &RequestId) -> Result<(), GateError> {
        if self.resolved.contains(id) {
            return Err(GateError::AlreadyResolved(id.clone()));
        }
        if !self.is_pending(id) {
            return Err(GateError::UnknownRequest(id.clone()));
        }
        Ok(())
    }

    /// Resolve a pending request with the human's reply
    pub fn resolve(&mut self, id: &RequestId, reply: impl Into<String>) -> Result<HumanDecision, GateError> {
        debug!(request_id = %id, "HumanGate::resolve: called");
        self.check(id)?;

        self.pending.retain(|p| &p.id != id);
        self.resolved.insert(id.clone());
        Ok(HumanDecision::new(id.clone(), reply))
    }

    pub fn is_pending(&self, id: &RequestId) -> bool {
        self.pending.iter().any(|p| &p.id == id)
    }

    /// Snapshot of every pending request
    pub fn pending(&self) -> Vec<PendingRequest> {
        self.pending.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
