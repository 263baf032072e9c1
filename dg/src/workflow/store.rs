//! Draft Store - the current draft and its iteration counter

use tracing::debug;

use super::messages::CritiqueRequest;

/// Holds the most recently captured draft
///
/// The iteration counter only moves through [`DraftStore::advance`], which
/// the critique relay calls once per critique.
#[derive(Debug, Default, Clone)]
pub struct DraftStore {
    draft: String,
    iteration: u32,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `draft`, keeping the iteration count, and address it to the critic
    pub fn capture(&mut self, draft: impl Into<String>) -> CritiqueRequest {
        let draft = draft.into();
        debug!(draft_len = draft.len(), iteration = self.iteration, "DraftStore::capture: called");
        self.draft = draft.clone();
        CritiqueRequest { draft }
    }

    /// Current draft and iteration
    pub fn current(&self) -> (&str, u32) {
        (&self.draft, self.iteration)
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub(crate) fn advance(&mut self) -> u32 {
        self.iteration += 1;
        self.iteration
    }
}
