use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Provider identity
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// The upstream completion providers the pipeline can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Anthropic Messages API (the primary provider).
    Anthropic,
    /// OpenRouter multi-vendor gateway (OpenAI chat-completions wire shape).
    Openrouter,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Anthropic => "anthropic",
            ProviderId::Openrouter => "openrouter",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process-wide configuration, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Explicitly selected provider. When set it always wins over any
    /// model-hint heuristic.
    #[serde(default)]
    pub provider: Option<ProviderId>,
    #[serde(default)]
    pub anthropic: EndpointConfig,
    #[serde(default)]
    pub openrouter: EndpointConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

/// Credentials and optional base-URL override for one provider endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EndpointConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    /// `None` means the provider's well-known URL.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Request-shaping knobs for completion calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Default model when the caller supplies no hint.
    #[serde(default = "d_model")]
    pub default_model: String,
    /// Hard wall-clock bound on a single provider call.
    #[serde(default = "d_60000")]
    pub timeout_ms: u64,
    /// Output token budget for single-shape (review or improve) calls.
    #[serde(default = "d_2000")]
    pub max_tokens: u32,
    /// Output token budget for the combined analyze-and-improve call,
    /// which returns the union of both shapes.
    #[serde(default = "d_3000")]
    pub combined_max_tokens: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            default_model: d_model(),
            timeout_ms: 60_000,
            max_tokens: 2_000,
            combined_max_tokens: 3_000,
        }
    }
}

/// Where session logs and summaries land.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default = "d_sessions_dir")]
    pub dir: PathBuf,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            dir: d_sessions_dir(),
        }
    }
}

impl Config {
    /// Build a config from the environment variables the service has always
    /// been driven by: `AI_PROVIDER`, `ANTHROPIC_API_KEY`,
    /// `OPENROUTER_API_KEY`, and optional `*_BASE_URL` overrides.
    pub fn from_env() -> Result<Self> {
        let provider = match std::env::var("AI_PROVIDER") {
            Ok(v) => Some(parse_provider(&v)?),
            Err(_) => None,
        };

        let mut cfg = Config {
            provider,
            ..Default::default()
        };
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            cfg.anthropic.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("ANTHROPIC_BASE_URL") {
            cfg.anthropic.base_url = Some(url);
        }
        if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            cfg.openrouter.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("OPENROUTER_BASE_URL") {
            cfg.openrouter.base_url = Some(url);
        }
        Ok(cfg)
    }

    /// The endpoint config for a given provider.
    pub fn endpoint(&self, provider: ProviderId) -> &EndpointConfig {
        match provider {
            ProviderId::Anthropic => &self.anthropic,
            ProviderId::Openrouter => &self.openrouter,
        }
    }

    /// The effective base URL for a provider: the configured override, or
    /// the provider's well-known endpoint.
    pub fn base_url(&self, provider: ProviderId) -> &str {
        if let Some(url) = self.endpoint(provider).base_url.as_deref() {
            return url;
        }
        match provider {
            ProviderId::Anthropic => ANTHROPIC_BASE_URL,
            ProviderId::Openrouter => OPENROUTER_BASE_URL,
        }
    }
}

fn parse_provider(s: &str) -> Result<ProviderId> {
    match s.to_ascii_lowercase().as_str() {
        // "claude" is the historical value for the primary provider.
        "claude" | "anthropic" => Ok(ProviderId::Anthropic),
        "openrouter" | "gateway" => Ok(ProviderId::Openrouter),
        other => Err(Error::Config(format!(
            "unknown AI_PROVIDER '{other}' (expected 'claude' or 'openrouter')"
        ))),
    }
}

// ── serde default helpers ──────────────────────────────────────────

fn d_model() -> String {
    "claude-sonnet-4-5-20250929".into()
}

fn d_60000() -> u64 {
    60_000
}

fn d_2000() -> u32 {
    2_000
}

fn d_3000() -> u32 {
    3_000
}

fn d_sessions_dir() -> PathBuf {
    PathBuf::from("./data/sessions")
}
