//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults, and
//! compiles them into a [`Templates`] set the workflow renders from.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::{Handlebars, RenderError};
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Every template the workflow needs
pub const TEMPLATE_NAMES: [&str; 5] = ["writer", "reviewer", "review-request", "revision", "human-instruction"];

/// Context for the review request sent to the critic
#[derive(Debug, Clone, Serialize)]
pub struct ReviewContext<'a> {
    pub draft: &'a str,
}

/// Context for the revision request sent back to the writer
#[derive(Debug, Clone, Serialize)]
pub struct RevisionContext<'a> {
    pub draft: &'a str,
    pub critique: &'a str,
    pub instructions: &'a str,
}

/// Loads prompt templates
pub struct PromptLoader {
    /// User override directory (e.g., `.draftgate/prompts/`)
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader rooted at `root`
    ///
    /// Templates in `{root}/.draftgate/prompts/{name}.pmt` override the
    /// embedded ones.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let user_dir = root.as_ref().join(".draftgate/prompts");
        let user_dir_exists = user_dir.exists();
        debug!(?user_dir, %user_dir_exists, "PromptLoader::new: called");

        Self {
            user_dir: user_dir_exists.then_some(user_dir),
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self { user_dir: None }
    }

    /// Load a template by name
    ///
    /// Checks the user override directory first, then the embedded fallback.
    pub fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Load and compile every workflow template
    pub fn compile(&self) -> Result<Templates> {
        debug!("PromptLoader::compile: called");
        let mut hbs = Handlebars::new();
        // Drafts and critiques must reach the agents verbatim
        hbs.register_escape_fn(handlebars::no_escape);

        for name in TEMPLATE_NAMES {
            let source = self.load_template(name)?;
            hbs.register_template_string(name, source)
                .map_err(|e| eyre!("Failed to compile template {}: {}", name, e))?;
        }

        Ok(Templates { hbs })
    }
}

/// Compiled prompt templates
#[derive(Clone)]
pub struct Templates {
    hbs: Handlebars<'static>,
}

impl Templates {
    /// Compile the embedded templates
    pub fn embedded() -> Result<Self> {
        PromptLoader::embedded_only().compile()
    }

    fn render_plain(&self, name: &str) -> Result<String, RenderError> {
        self.hbs
            .render(name, &serde_json::Value::Null)
            .map(|s| s.trim_end().to_string())
    }

    /// Writer agent instructions
    pub fn writer_instructions(&self) -> Result<String, RenderError> {
        self.render_plain("writer")
    }

    /// Reviewer agent instructions
    pub fn reviewer_instructions(&self) -> Result<String, RenderError> {
        self.render_plain("reviewer")
    }

    /// Instruction shown to the human with every review request
    pub fn human_instruction(&self) -> Result<String, RenderError> {
        self.render_plain("human-instruction")
    }

    /// Request asking the critic to review `draft`
    pub fn review_request(&self, draft: &str) -> Result<String, RenderError> {
        debug!(draft_len = draft.len(), "Templates::review_request: called");
        self.hbs.render("review-request", &ReviewContext { draft })
    }

    /// Request asking the writer to revise
    pub fn revision(&self, context: &RevisionContext<'_>) -> Result<String, RenderError> {
        debug!(
            draft_len = context.draft.len(),
            critique_len = context.critique.len(),
            "Templates::revision: called"
        );
        self.hbs.render("revision", context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_loader_unknown_template() {
        let loader = PromptLoader::embedded_only();
        assert!(loader.load_template("nonexistent-template").is_err());
    }

    #[test]
    fn test_revision_renders_verbatim() {
        let templates = Templates::embedded().unwrap();
        let prompt = templates
            .revision(&RevisionContext {
                draft: "Fast & <fun> \"SUV\"",
                critique: "too short",
                instructions: "make it punchier",
            })
            .unwrap();

        assert!(prompt.contains("Fast & <fun> \"SUV\""));
        assert!(prompt.contains("too short"));
        assert!(prompt.contains("make it punchier"));
    }

    #[test]
    fn test_review_request_contains_draft() {
        let templates = Templates::embedded().unwrap();
        let prompt = templates.review_request("Drive Bold.").unwrap();
        assert!(prompt.contains("Drive Bold."));
    }

    #[test]
    fn test_user_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let prompts = dir.path().join(".draftgate/prompts");
        std::fs::create_dir_all(&prompts).unwrap();
        std::fs::write(prompts.join("human-instruction.pmt"), "Say approve or else.\n").unwrap();

        let templates = PromptLoader::new(dir.path()).compile().unwrap();
        assert_eq!(templates.human_instruction().unwrap(), "Say approve or else.");
        // Untouched templates still come from the embedded set
        assert!(templates.writer_instructions().unwrap().contains("content writer"));
    }

    #[test]
    fn test_broken_override_fails_compile() {
        let dir = tempfile::tempdir().unwrap();
        let prompts = dir.path().join(".draftgate/prompts");
        std::fs::create_dir_all(&prompts).unwrap();
        std::fs::write(prompts.join("revision.pmt"), "{{#if draft}}unclosed").unwrap();

        assert!(PromptLoader::new(dir.path()).compile().is_err());
    }
}
