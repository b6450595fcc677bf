//! Configuration management for MimiChat
//!
//! Settings come from an optional TOML file, then the environment (`.env` is
//! loaded first). The result is built once at startup and shared read-only.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::llm::{SamplingParams, WINDOW_SIZE};
use crate::persona::FALLBACK_REPLY;
use crate::rewrite::{AddressRewriter, AddressTerms};

/// Supported OpenAI-compatible providers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Groq cloud (default)
    #[default]
    Groq,
    /// OpenAI platform
    OpenAI,
    /// OpenRouter aggregator
    OpenRouter,
}

impl Provider {
    /// Display name, also the value accepted in config and env
    pub fn name(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenAI => "openai",
            Self::OpenRouter => "openrouter",
        }
    }

    /// Base URL of the Chat Completions API
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::OpenAI => "https://api.openai.com/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    /// Model used when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Groq => "llama-3.1-8b-instant",
            Self::OpenAI => "gpt-4o-mini",
            Self::OpenRouter => "meta-llama/llama-3.1-8b-instruct",
        }
    }

    /// Provider-specific API key variable
    pub fn key_env(&self) -> &'static str {
        match self {
            Self::Groq => "GROQ_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
        }
    }

    /// Provider-specific model variable
    pub fn model_env(&self) -> &'static str {
        match self {
            Self::Groq => "GROQ_MODEL",
            Self::OpenAI => "OPENAI_MODEL",
            Self::OpenRouter => "OPENROUTER_MODEL",
        }
    }

    /// Get all available providers
    pub fn all() -> Vec<Self> {
        vec![Self::Groq, Self::OpenAI, Self::OpenRouter]
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Self::all().into_iter().find(|p| p.name() == value)
    }
}

/// Origins the storefront widget is served from
pub fn default_allowed_origins() -> Vec<String> {
    vec![
        "https://animekpdtshop.com".to_string(),
        "https://www.animekpdtshop.com".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

/// MimiChat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: Provider,
    /// Model override; falls back to the provider default
    pub model: Option<String>,
    /// Never written back out
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL override; falls back to the provider default
    pub base_url: Option<String>,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub sampling: SamplingParams,
    /// Wait before the single rate-limit retry
    pub retry_backoff_ms: u64,
    /// Number of history turns forwarded upstream
    pub history_window: usize,
    pub request_timeout_secs: u64,
    pub address: AddressTerms,
    pub fallback_reply: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            api_key: None,
            base_url: None,
            port: 8787,
            allowed_origins: default_allowed_origins(),
            sampling: SamplingParams::default(),
            retry_backoff_ms: 800,
            history_window: WINDOW_SIZE,
            request_timeout_secs: 30,
            address: AddressTerms::default(),
            fallback_reply: FALLBACK_REPLY.to_string(),
        }
    }
}

impl Config {
    /// Load from an optional TOML file plus the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // A missing .env is fine; variables may be set externally.
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Apply environment overrides. Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(name) = get("MIMICHAT_PROVIDER") {
            self.provider = Provider::parse(&name)
                .with_context(|| format!("Unknown provider '{name}'"))?;
        }
        if let Some(model) = get("MIMICHAT_MODEL").or_else(|| get(self.provider.model_env())) {
            self.model = Some(model);
        }
        if let Some(key) = get("MIMICHAT_API_KEY").or_else(|| get(self.provider.key_env())) {
            self.api_key = Some(key);
        }
        if let Some(url) = get("MIMICHAT_BASE_URL") {
            self.base_url = Some(url);
        }
        if let Some(port) = get("PORT") {
            self.port = port.parse().with_context(|| format!("Invalid PORT '{port}'"))?;
        }
        if let Some(origins) = get("ALLOWED_ORIGINS") {
            self.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(ms) = get("RETRY_BACKOFF_MS") {
            self.retry_backoff_ms = ms
                .parse()
                .with_context(|| format!("Invalid RETRY_BACKOFF_MS '{ms}'"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.base_url();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("Base URL must start with http:// or https:// (got '{url}')");
        }
        if self.history_window == 0 {
            bail!("history_window must be at least 1");
        }
        if self.address.first.trim().is_empty() || self.address.rest.trim().is_empty() {
            bail!("Address terms must not be empty");
        }

        // The fallback is sent verbatim on upstream failure, so it must
        // already follow the address-term policy.
        let rewriter = AddressRewriter::new(self.address.clone())
            .context("Failed to compile address-term patterns")?;
        if self.fallback_reply.trim().is_empty() {
            bail!("fallback_reply must not be empty");
        }
        let rewritten = rewriter.rewrite(&self.fallback_reply);
        if rewritten != self.fallback_reply {
            bail!(
                "fallback_reply does not follow the address-term policy; use something like '{rewritten}'"
            );
        }
        Ok(())
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(self.provider.default_model())
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(self.provider.base_url())
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }
}
