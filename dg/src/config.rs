//! draftgate configuration types and loading

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Main draftgate configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Writer (drafter) agent
    pub writer: AgentConfig,

    /// Reviewer (critic) agent
    pub reviewer: AgentConfig,

    /// Approval loop behavior
    pub workflow: WorkflowConfig,

    /// Workflow diagram export
    pub diagram: DiagramConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that every environment variable the provider needs is set.
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        for var in self.llm.required_env() {
            if std::env::var(var).map(|v| v.trim().is_empty()).unwrap_or(true) {
                return Err(eyre!(
                    "Required setting not found. Set the {} environment variable.",
                    var
                ));
            }
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .draftgate.yml
        let local_config = PathBuf::from(".draftgate.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/draftgate/draftgate.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("draftgate").join("draftgate.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are swallowed; the full `load` reports them once logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = config_path.cloned().or_else(|| {
            let local = PathBuf::from(".draftgate.yml");
            local.exists().then_some(local)
        })?;
        let content = fs::read_to_string(path).ok()?;
        let config: Self = serde_yaml::from_str(&content).ok()?;
        config.log_level
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Resolve the LLM settings against the environment
    pub fn resolve_llm(&self) -> Result<ResolvedLlmConfig> {
        self.llm.resolve()
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAI,
    Azure,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAI => write!(f, "openai"),
            Provider::Azure => write!(f, "azure"),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("openai" or "azure")
    pub provider: Provider,

    /// Model identifier (ignored by Azure, which routes by deployment)
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL (openai only)
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable containing the Azure endpoint
    #[serde(rename = "endpoint-env")]
    pub endpoint_env: String,

    /// Environment variable containing the Azure deployment name
    #[serde(rename = "deployment-env")]
    pub deployment_env: String,

    /// Azure REST API version
    #[serde(rename = "api-version")]
    pub api_version: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Azure,
            model: "gpt-4o".to_string(),
            api_key_env: "AZURE_OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            endpoint_env: "AZURE_OPENAI_ENDPOINT".to_string(),
            deployment_env: "AZURE_OPENAI_CHAT_DEPLOYMENT_NAME".to_string(),
            api_version: "2024-10-21".to_string(),
            max_tokens: 4096,
            timeout_ms: 120_000,
        }
    }
}

impl LlmConfig {
    /// Environment variables this provider cannot run without
    pub fn required_env(&self) -> Vec<&str> {
        match self.provider {
            Provider::OpenAI => vec![self.api_key_env.as_str()],
            Provider::Azure => vec![
                self.endpoint_env.as_str(),
                self.deployment_env.as_str(),
                self.api_key_env.as_str(),
            ],
        }
    }

    /// Resolve env-backed settings into a concrete client configuration
    pub fn resolve(&self) -> Result<ResolvedLlmConfig> {
        let api_key = read_env(&self.api_key_env)?;

        let url = match self.provider {
            Provider::OpenAI => format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/')),
            Provider::Azure => {
                let endpoint = read_env(&self.endpoint_env)?;
                let deployment = read_env(&self.deployment_env)?;
                format!(
                    "{}/openai/deployments/{}/chat/completions?api-version={}",
                    endpoint.trim_end_matches('/'),
                    deployment,
                    self.api_version
                )
            }
        };

        Ok(ResolvedLlmConfig {
            provider: self.provider,
            model: self.model.clone(),
            url,
            api_key,
            max_tokens: self.max_tokens,
            timeout_ms: self.timeout_ms,
        })
    }
}

fn read_env(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(eyre!("Required setting not found. Set the {} environment variable.", var)),
    }
}

/// LLM settings with every env-backed value filled in
#[derive(Clone)]
pub struct ResolvedLlmConfig {
    pub provider: Provider,
    pub model: String,
    /// Full Chat Completions URL
    pub url: String,
    pub api_key: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl fmt::Debug for ResolvedLlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedLlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("max_tokens", &self.max_tokens)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Per-agent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Display name; defaults to "Writer" / "Reviewer"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Instructions overriding the embedded prompt template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Replay earlier turns on every call
    #[serde(rename = "keep-history")]
    pub keep_history: Option<bool>,
}

/// How the driver hands human replies back to the workflow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeMode {
    /// Collect replies for every pending request, then resume once
    #[default]
    Batch,
    /// Resume after each reply
    Immediate,
}

impl std::str::FromStr for ResumeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "batch" => Ok(ResumeMode::Batch),
            "immediate" => Ok(ResumeMode::Immediate),
            other => Err(format!("unknown resume mode '{}' (expected batch or immediate)", other)),
        }
    }
}

/// Approval loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Initial task given to the writer when none is passed on the command line
    pub task: String,

    /// Driver resume strategy
    pub mode: ResumeMode,

    /// Write the run's events to a JSONL file
    #[serde(rename = "event-log")]
    pub event_log: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            task: "Create a slogan for a new electric SUV that is affordable and fun to drive.".to_string(),
            mode: ResumeMode::Batch,
            event_log: true,
        }
    }
}

/// Diagram output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramFormat {
    #[default]
    Svg,
    Dot,
}

impl DiagramFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DiagramFormat::Svg => "svg",
            DiagramFormat::Dot => "dot",
        }
    }
}

impl std::str::FromStr for DiagramFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "svg" => Ok(DiagramFormat::Svg),
            "dot" => Ok(DiagramFormat::Dot),
            other => Err(format!("unknown diagram format '{}' (expected svg or dot)", other)),
        }
    }
}

/// Workflow diagram export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    /// Export a diagram before each run
    pub enabled: bool,

    /// Output path without extension
    pub path: PathBuf,

    /// Output format
    pub format: DiagramFormat,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("HumanInTheLoop_Workflow"),
            format: DiagramFormat::Svg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.provider, Provider::Azure);
        assert_eq!(config.workflow.mode, ResumeMode::Batch);
        assert!(config.diagram.enabled);
        assert!(config.writer.name.is_none());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
llm:
  provider: openai
  model: gpt-4o-mini
  api-key-env: MY_API_KEY
  base-url: https://api.example.com/
  max-tokens: 2048
  timeout-ms: 60000

writer:
  name: Copywriter
  keep-history: false

reviewer:
  instructions: "Be harsh."

workflow:
  task: "write a slogan"
  mode: immediate
  event-log: false

diagram:
  enabled: false
  format: dot

log-level: debug
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.provider, Provider::OpenAI);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.api_key_env, "MY_API_KEY");
        assert_eq!(config.llm.max_tokens, 2048);
        assert_eq!(config.writer.name.as_deref(), Some("Copywriter"));
        assert_eq!(config.writer.keep_history, Some(false));
        assert_eq!(config.reviewer.instructions.as_deref(), Some("Be harsh."));
        assert_eq!(config.workflow.task, "write a slogan");
        assert_eq!(config.workflow.mode, ResumeMode::Immediate);
        assert!(!config.workflow.event_log);
        assert!(!config.diagram.enabled);
        assert_eq!(config.diagram.format, DiagramFormat::Dot);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
llm:
  model: gpt-4.1
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.model, "gpt-4.1");
        assert_eq!(config.llm.provider, Provider::Azure);
        assert_eq!(config.llm.api_key_env, "AZURE_OPENAI_API_KEY");
        assert_eq!(config.workflow.mode, ResumeMode::Batch);
    }

    #[test]
    fn test_required_env_per_provider() {
        let mut llm = LlmConfig::default();
        assert_eq!(
            llm.required_env(),
            vec![
                "AZURE_OPENAI_ENDPOINT",
                "AZURE_OPENAI_CHAT_DEPLOYMENT_NAME",
                "AZURE_OPENAI_API_KEY"
            ]
        );

        llm.provider = Provider::OpenAI;
        llm.api_key_env = "OPENAI_API_KEY".to_string();
        assert_eq!(llm.required_env(), vec!["OPENAI_API_KEY"]);
    }

    #[test]
    #[serial]
    fn test_validate_reports_missing_env() {
        let mut config = Config::default();
        config.llm.provider = Provider::OpenAI;
        config.llm.api_key_env = "DG_TEST_MISSING_KEY".to_string();
        unsafe { std::env::remove_var("DG_TEST_MISSING_KEY") };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("DG_TEST_MISSING_KEY"));
    }

    #[test]
    #[serial]
    fn test_resolve_azure_url() {
        let llm = LlmConfig {
            api_key_env: "DG_TEST_AZURE_KEY".to_string(),
            endpoint_env: "DG_TEST_AZURE_ENDPOINT".to_string(),
            deployment_env: "DG_TEST_AZURE_DEPLOYMENT".to_string(),
            ..LlmConfig::default()
        };
        unsafe {
            std::env::set_var("DG_TEST_AZURE_KEY", "secret");
            std::env::set_var("DG_TEST_AZURE_ENDPOINT", "https://example.openai.azure.com/");
            std::env::set_var("DG_TEST_AZURE_DEPLOYMENT", "chat");
        }

        let resolved = llm.resolve().unwrap();
        assert_eq!(
            resolved.url,
            "https://example.openai.azure.com/openai/deployments/chat/chat/completions?api-version=2024-10-21"
        );
        assert_eq!(resolved.api_key, "secret");
        assert!(!format!("{:?}", resolved).contains("secret"));

        unsafe {
            std::env::remove_var("DG_TEST_AZURE_KEY");
            std::env::remove_var("DG_TEST_AZURE_ENDPOINT");
            std::env::remove_var("DG_TEST_AZURE_DEPLOYMENT");
        }
    }

    #[test]
    #[serial]
    fn test_resolve_openai_url() {
        let llm = LlmConfig {
            provider: Provider::OpenAI,
            api_key_env: "DG_TEST_OPENAI_KEY".to_string(),
            base_url: "https://api.example.com/".to_string(),
            ..LlmConfig::default()
        };
        unsafe { std::env::set_var("DG_TEST_OPENAI_KEY", "sk-test") };

        let resolved = llm.resolve().unwrap();
        assert_eq!(resolved.url, "https://api.example.com/v1/chat/completions");

        unsafe { std::env::remove_var("DG_TEST_OPENAI_KEY") };
    }

    #[test]
    fn test_mode_and_format_from_str() {
        assert_eq!("BATCH".parse::<ResumeMode>().unwrap(), ResumeMode::Batch);
        assert_eq!("immediate".parse::<ResumeMode>().unwrap(), ResumeMode::Immediate);
        assert!("later".parse::<ResumeMode>().is_err());
        assert_eq!("dot".parse::<DiagramFormat>().unwrap(), DiagramFormat::Dot);
        assert!("png".parse::<DiagramFormat>().is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.yml");
        std::fs::write(&path, "workflow:\n  task: from file\nlog-level: WARN\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.workflow.task, "from file");
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("WARN"));
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let path = PathBuf::from("/nonexistent/draftgate.yml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
