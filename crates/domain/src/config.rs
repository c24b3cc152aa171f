use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub tool_host: ToolHostConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Upstream model endpoint
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Full URL of the chat completions endpoint.
    #[serde(default = "d_llm_url")]
    pub url: String,
    #[serde(default = "d_model")]
    pub model: String,
    #[serde(default = "d_temperature")]
    pub temperature: f64,
    /// Per-request timeout covering one full streaming call.
    /// `None` means no timeout (long generations).
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: d_llm_url(),
            model: d_model(),
            temperature: d_temperature(),
            request_timeout_secs: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool host (MCP server subprocess)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolHostConfig {
    #[serde(default = "d_tool_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Timeout for one `tools/call` round trip. A timeout fails only
    /// that call, never the request as a whole.
    #[serde(default = "d_30")]
    pub call_timeout_secs: u64,
}

impl Default for ToolHostConfig {
    fn default() -> Self {
        Self {
            command: d_tool_command(),
            args: Vec::new(),
            env: HashMap::new(),
            call_timeout_secs: d_30(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Assistant behavior
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Language used when the request does not carry one.
    #[serde(default = "d_language")]
    pub default_language: String,
    /// Directory holding per-language `schemas.json` files.
    #[serde(default = "d_knowledge_dir")]
    pub knowledge_dir: PathBuf,
    /// How many trailing history turns go into the draft prompt.
    #[serde(default = "d_4")]
    pub history_window: usize,
    /// Tools that must not execute for an unauthenticated caller.
    /// Fixed at process start, read-only at request time.
    #[serde(default = "d_restricted_tools")]
    pub restricted_tools: Vec<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            default_language: d_language(),
            knowledge_dir: d_knowledge_dir(),
            history_window: d_4(),
            restricted_tools: d_restricted_tools(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Defaults
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn d_llm_url() -> String {
    "https://chat.aitil.kg/suroo".into()
}

fn d_model() -> String {
    "aitil".into()
}

fn d_temperature() -> f64 {
    0.5
}

fn d_tool_command() -> String {
    "python".into()
}

fn d_language() -> String {
    "ky".into()
}

fn d_knowledge_dir() -> PathBuf {
    PathBuf::from("knowledge")
}

fn d_30() -> u64 {
    30
}

fn d_4() -> usize {
    4
}

fn d_restricted_tools() -> Vec<String> {
    [
        "get_balance",
        "get_transactions",
        "transfer_money",
        "get_last_incoming_transaction",
        "get_accounts_info",
        "get_incoming_sum_for_period",
        "get_outgoing_sum_for_period",
        "get_last_3_transfer_recipients",
        "get_largest_transaction",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
