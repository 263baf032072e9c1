//! draftgate - Writer/Reviewer approval loop with a human gate
//!
//! A writer agent drafts, a reviewer agent critiques, and a human either
//! approves the draft or sends it back with revision instructions. The loop
//! repeats until the human approves.
//!
//! # Modules
//!
//! - [`workflow`] - Draft store, critique relay, human gate, approval controller and engine
//! - [`agent`] - Writer and reviewer roles
//! - [`llm`] - Chat Completions client (OpenAI and Azure OpenAI)
//! - [`prompts`] - Handlebars prompt templates
//! - [`events`] - Event bus and JSONL event log
//! - [`viz`] - Graphviz diagram export
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod agent;
pub mod cli;
pub mod config;
pub mod events;
pub mod llm;
pub mod prompts;
pub mod viz;
pub mod workflow;

// Re-export commonly used types
pub use agent::{Agent, AgentPair, ChatAgent};
pub use config::{Config, ResumeMode};
pub use events::{EventBus, RunState, WorkflowEvent};
pub use llm::{LlmClient, LlmError, create_client};
pub use prompts::{PromptLoader, Templates};
pub use workflow::{
    ApprovalController, ApprovalDriver, ConsoleResponder, FinalOutput, HumanGate, HumanResponder, RequestId, Workflow,
    WorkflowError,
};
