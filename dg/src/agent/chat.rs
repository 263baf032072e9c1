//! ChatAgent - an Agent backed by an LlmClient

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::Agent;
use crate::llm::{CompletionRequest, LlmClient, LlmError, Message};

/// Agent that answers each prompt with one completion call
///
/// With history enabled, earlier prompts and replies are replayed so the
/// writer sees its own previous drafts when asked to revise.
pub struct ChatAgent {
    name: String,
    instructions: String,
    client: Arc<dyn LlmClient>,
    max_tokens: u32,
    keep_history: bool,
    history: Mutex<Vec<Message>>,
}

impl ChatAgent {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>, client: Arc<dyn LlmClient>) -> Self {
        let name = name.into();
        debug!(%name, "ChatAgent::new: called");
        Self {
            name,
            instructions: instructions.into(),
            client,
            max_tokens: 4096,
            keep_history: true,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_history(mut self, keep_history: bool) -> Self {
        self.keep_history = keep_history;
        self
    }

    /// Number of messages currently remembered
    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }
}

#[async_trait]
impl Agent for ChatAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, prompt: &str) -> Result<String, LlmError> {
        debug!(agent = %self.name, prompt_len = prompt.len(), "ChatAgent::run: called");
        let mut history = self.history.lock().await;

        let mut messages = if self.keep_history { history.clone() } else { Vec::new() };
        messages.push(Message::user(prompt));

        let request = CompletionRequest {
            system_prompt: self.instructions.clone(),
            messages,
            max_tokens: self.max_tokens,
        };

        let response = self.client.complete(request).await?;
        let text = response.text_or_empty().to_string();
        info!(
            agent = %self.name,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "agent responded"
        );

        // Only a successful turn is remembered
        if self.keep_history {
            history.push(Message::user(prompt));
            history.push(Message::assistant(text.clone()));
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use crate::llm::{CompletionResponse, Role, StopReason, TokenUsage};

    #[tokio::test]
    async fn test_run_returns_text_and_remembers_turns() {
        let client = Arc::new(MockLlmClient::with_texts(&["Drive Bold.", "Drive Bold. Drive Electric."]));
        let agent = ChatAgent::new("Writer", "You write slogans.", client.clone());

        assert_eq!(agent.run("write a slogan").await.unwrap(), "Drive Bold.");
        assert_eq!(agent.run("make it punchier").await.unwrap(), "Drive Bold. Drive Electric.");
        assert_eq!(agent.history_len().await, 4);

        let requests = client.requests();
        assert_eq!(requests[0].system_prompt, "You write slogans.");
        assert_eq!(requests[0].messages.len(), 1);
        // Second call replays the first turn
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(requests[1].messages[1].role, Role::Assistant);
        assert_eq!(requests[1].messages[1].content, "Drive Bold.");
    }

    #[tokio::test]
    async fn test_run_without_history() {
        let client = Arc::new(MockLlmClient::with_texts(&["one", "two"]));
        let agent = ChatAgent::new("Reviewer", "Review.", client.clone()).with_history(false);

        agent.run("first").await.unwrap();
        agent.run("second").await.unwrap();

        assert_eq!(agent.history_len().await, 0);
        assert_eq!(client.requests()[1].messages, vec![Message::user("second")]);
    }

    #[tokio::test]
    async fn test_missing_content_is_empty_string() {
        let client = Arc::new(MockLlmClient::new(vec![CompletionResponse {
            content: None,
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }]));
        let agent = ChatAgent::new("Writer", "Write.", client);

        assert_eq!(agent.run("anything").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_failed_call_is_not_remembered() {
        let client = Arc::new(MockLlmClient::new(vec![]));
        let agent = ChatAgent::new("Writer", "Write.", client);

        assert!(agent.run("anything").await.is_err());
        assert_eq!(agent.history_len().await, 0);
    }
}
