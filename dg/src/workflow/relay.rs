//! Critique Relay - carries drafts to the critic and critiques to the human

use handlebars::RenderError;
use tracing::debug;

use super::messages::{CritiqueRequest, HumanReviewRequest, ReviewCycle};
use super::store::DraftStore;
use crate::prompts::Templates;

pub struct CritiqueRelay {
    templates: Templates,
    /// Rendered once; identical for every request
    instruction: String,
}

impl CritiqueRelay {
    pub fn new(templates: Templates) -> Result<Self, RenderError> {
        let instruction = templates.human_instruction()?;
        Ok(Self { templates, instruction })
    }

    /// Prompt asking the critic to review a captured draft
    pub fn review_prompt(&self, request: &CritiqueRequest) -> Result<String, RenderError> {
        self.templates.review_request(&request.draft)
    }

    /// Attach `critique` to the store's current draft
    ///
    /// Advances the iteration exactly once and returns the new cycle together
    /// with the request for the human gate.
    pub fn relay(&self, store: &mut DraftStore, critique: impl Into<String>) -> (ReviewCycle, HumanReviewRequest) {
        let critique = critique.into();
        let iteration = store.advance();
        debug!(iteration, critique_len = critique.len(), "CritiqueRelay::relay: called");

        let cycle = ReviewCycle {
            draft: store.draft().to_string(),
            critique,
            iteration,
        };
        let request = HumanReviewRequest {
            prompt: self.instruction.clone(),
            draft: cycle.draft.clone(),
            critique: cycle.critique.clone(),
            iteration,
        };
        (cycle, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn relay() -> CritiqueRelay {
        CritiqueRelay::new(Templates::embedded().unwrap()).unwrap()
    }

    #[test]
    fn test_relay_builds_request_from_latest_draft() {
        let relay = relay();
        let mut store = DraftStore::new();
        store.capture("Drive Bold.");

        let (cycle, request) = relay.relay(&mut store, "too short");

        assert_eq!(cycle.iteration, 1);
        assert_eq!(cycle.draft, "Drive Bold.");
        assert_eq!(request.draft, "Drive Bold.");
        assert_eq!(request.critique, "too short");
        assert_eq!(request.iteration, 1);
        assert!(request.prompt.contains("approve"));
    }

    #[test]
    fn test_review_prompt_carries_draft() {
        let relay = relay();
        let prompt = relay
            .review_prompt(&CritiqueRequest {
                draft: "Drive Bold.".to_string(),
            })
            .unwrap();
        assert!(prompt.contains("Drive Bold."));
    }

    #[test]
    fn test_empty_critique_is_relayed() {
        let relay = relay();
        let mut store = DraftStore::new();
        store.capture("x");
        let (cycle, _) = relay.relay(&mut store, "");
        assert_eq!(cycle.critique, "");
    }

    proptest! {
        #[test]
        fn prop_relay_increments_iteration_once(
            drafts in proptest::collection::vec(".{0,40}", 1..8),
            critique in ".{0,40}",
        ) {
            let relay = relay();
            let mut store = DraftStore::new();
            for draft in &drafts {
                store.capture(draft.clone());
                let before = store.iteration();
                let (cycle, request) = relay.relay(&mut store, critique.clone());
                prop_assert_eq!(cycle.iteration, before + 1);
                prop_assert_eq!(store.iteration(), before + 1);
                prop_assert_eq!(request.iteration, cycle.iteration);
                prop_assert_eq!(&cycle.draft, draft);
            }
            prop_assert_eq!(store.iteration() as usize, drafts.len());
        }
    }
}
