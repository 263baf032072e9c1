//! Agents - the writer (drafter) and reviewer (critic) roles
//!
//! The approval loop only needs "prompt in, text out"; how an agent produces
//! its text is behind the [`Agent`] trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

mod chat;

pub use chat::ChatAgent;

use crate::config::{AgentConfig, LlmConfig};
use crate::llm::{LlmClient, LlmError};

/// A text-producing role in the workflow
#[async_trait]
pub trait Agent: Send + Sync {
    /// Display name used in logs and events
    fn name(&self) -> &str;

    /// Produce a response for `prompt`
    ///
    /// An empty string is a valid answer; errors are fatal for the run.
    async fn run(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Build a ChatAgent from config, falling back to the given defaults
pub fn build_agent(
    config: &AgentConfig,
    llm: &LlmConfig,
    default_name: &str,
    default_instructions: String,
    client: Arc<dyn LlmClient>,
) -> Arc<dyn Agent> {
    let name = config.name.clone().unwrap_or_else(|| default_name.to_string());
    debug!(%name, "build_agent: called");
    let instructions = config.instructions.clone().unwrap_or(default_instructions);

    Arc::new(
        ChatAgent::new(name, instructions, client)
            .with_max_tokens(llm.max_tokens)
            .with_history(config.keep_history.unwrap_or(true)),
    )
}

/// Agents for one workflow run
#[derive(Clone)]
pub struct AgentPair {
    pub writer: Arc<dyn Agent>,
    pub reviewer: Arc<dyn Agent>,
}

impl AgentPair {
    pub fn new(writer: Arc<dyn Agent>, reviewer: Arc<dyn Agent>) -> Self {
        Self { writer, reviewer }
    }
}
