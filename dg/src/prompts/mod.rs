//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files for the writer and
//! reviewer agents and for the messages routed between them.
//!
//! Template loading chain:
//! 1. `.draftgate/prompts/{name}.pmt` (user override)
//! 2. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution, without HTML
//! escaping.

pub mod embedded;
mod loader;

pub use loader::{PromptLoader, ReviewContext, RevisionContext, TEMPLATE_NAMES, Templates};
