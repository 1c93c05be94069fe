use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// LLM provider used for ticket generation. When absent the server still
    /// runs, but every generation job fails and tickets end up in `error`.
    #[serde(default)]
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub stream: StreamConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Available LLM providers
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Openai,
    // Future: Anthropic, Ollama
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Openai => "openai",
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Provider backend
    pub provider: LlmProvider,
    /// Provider API key
    pub api_key: String,
    /// Model name (e.g. "gpt-4o-mini")
    #[serde(default = "default_model")]
    pub model: String,
    /// API base URL override
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Request timeout in seconds; bounds the whole streamed call (default: 120)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Sampling temperature (default: 0.3)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_base() -> String {
    "https://api.openai.com".to_string()
}

fn default_timeout() -> u32 {
    120
}

fn default_temperature() -> f32 {
    0.3
}

/// Event streaming configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamConfig {
    /// Bounded queue size per attached listener. A listener whose queue is
    /// full has further events dropped rather than stalling the broadcast.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

fn default_subscriber_buffer() -> usize {
    256
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<SanitizedLlmConfig>,
    pub stream: StreamConfig,
}

/// Sanitized LLM config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLlmConfig {
    pub provider: String,
    pub model: String,
    pub api_base: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            llm: config.llm.as_ref().map(|l| SanitizedLlmConfig {
                provider: l.provider.as_str().to_string(),
                model: l.model.clone(),
                api_base: l.api_base.clone(),
                api_key_configured: !l.api_key.is_empty(),
                timeout_secs: l.timeout_secs,
            }),
            stream: config.stream.clone(),
        }
    }
}
