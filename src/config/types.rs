use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::*;

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Provider used by criteria and the summary unless they override it
    #[serde(default)]
    pub provider: Provider,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_launch_delay_ms")]
    pub launch_delay_ms: u64,

    /// Per-call timeout for provider invocations
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u64,

    /// Whole-run timeout; the run is cancelled when it expires
    #[serde(default)]
    pub run_timeout_sec: Option<u64>,

    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,

    #[serde(default = "default_pdftotext_binary")]
    pub pdftotext: PathBuf,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub summary: SummaryConfig,

    #[serde(default = "default_criteria")]
    pub criteria: Vec<CriterionConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub claude_cli: ClaudeCliConfig,

    #[serde(default)]
    pub codex_cli: CodexCliConfig,

    #[serde(default)]
    pub chat_api: ChatApiConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ClaudeCliConfig {
    #[serde(default = "default_claude_binary")]
    pub binary: PathBuf,

    #[serde(default = "default_claude_model")]
    pub model: String,
}

impl Default for ClaudeCliConfig {
    fn default() -> Self {
        Self {
            binary: default_claude_binary(),
            model: default_claude_model(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct CodexCliConfig {
    #[serde(default = "default_codex_binary")]
    pub binary: PathBuf,

    #[serde(default = "default_codex_model")]
    pub model: String,
}

impl Default for CodexCliConfig {
    fn default() -> Self {
        Self {
            binary: default_codex_binary(),
            model: default_codex_model(),
        }
    }
}

/// OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ChatApiConfig {
    #[serde(default = "default_chat_base_url")]
    pub base_url: String,

    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Name of the environment variable holding the bearer token
    #[serde(default = "default_chat_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_chat_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ChatApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_chat_base_url(),
            model: default_chat_model(),
            api_key_env: default_chat_api_key_env(),
            max_tokens: default_chat_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct SummaryConfig {
    #[serde(default)]
    pub provider: Option<Provider>,

    /// Falls back to the embedded summary prompt when unset
    #[serde(default)]
    pub prompt_file: Option<PathBuf>,

    #[serde(default)]
    pub timeout_sec: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct CriterionConfig {
    pub id: String,

    pub name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub provider: Option<Provider>,

    /// Falls back to the embedded prompt for built-in ids
    #[serde(default)]
    pub prompt_file: Option<PathBuf>,

    #[serde(default)]
    pub timeout_sec: Option<u64>,
}

impl CriterionConfig {
    pub fn builtin(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            enabled: true,
            provider: None,
            prompt_file: None,
            timeout_sec: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    ClaudeCli,
    CodexCli,
    ChatApi,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::ClaudeCli => write!(f, "claude_cli"),
            Provider::CodexCli => write!(f, "codex_cli"),
            Provider::ChatApi => write!(f, "chat_api"),
        }
    }
}
