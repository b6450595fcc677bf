//! The chat pipeline: window → completion → address-term rewrite.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::error::CompletionError;
use crate::llm::{ChatTurn, CompletionInvoker, LLMProvider, OpenAIProvider, RetryPolicy};
use crate::persona::compose_messages;
use crate::rewrite::AddressRewriter;

/// A validated chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatInput {
    pub msg: String,
    /// Rendered affinity level, passed through untouched
    pub level: String,
    pub history: Vec<ChatTurn>,
}

/// Turns a chat request into the final reply text.
pub struct ChatPipeline {
    invoker: CompletionInvoker,
    rewriter: AddressRewriter,
    history_window: usize,
}

impl ChatPipeline {
    pub fn new(invoker: CompletionInvoker, rewriter: AddressRewriter, history_window: usize) -> Self {
        Self {
            invoker,
            rewriter,
            history_window,
        }
    }

    /// Build the pipeline around any provider using the config's policies.
    pub fn with_provider(config: &Config, provider: Arc<dyn LLMProvider>) -> Result<Self> {
        let retry = RetryPolicy::with_backoff(Duration::from_millis(config.retry_backoff_ms));
        let invoker = CompletionInvoker::new(provider, retry, config.fallback_reply.clone());
        let rewriter = AddressRewriter::new(config.address.clone())
            .context("Failed to compile address-term patterns")?;
        Ok(Self::new(invoker, rewriter, config.history_window))
    }

    /// Build the pipeline against the configured OpenAI-compatible provider.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = OpenAIProvider::from_config(config)?;
        info!(
            provider = config.provider.name(),
            model = config.model(),
            has_key = config.has_key(),
            "completion provider ready"
        );
        Self::with_provider(config, Arc::new(provider))
    }

    pub fn provider(&self) -> &dyn LLMProvider {
        self.invoker.provider()
    }

    pub fn fallback(&self) -> &str {
        self.invoker.fallback()
    }

    /// Produce the rewritten reply, or the upstream error for the caller to absorb.
    pub async fn answer(&self, input: &ChatInput) -> Result<String, CompletionError> {
        let messages = compose_messages(&input.history, self.history_window, &input.level, &input.msg);
        let raw = self.invoker.invoke(&messages).await?;
        Ok(self.rewriter.rewrite(&raw))
    }

    /// Like [`answer`](Self::answer) but never fails: upstream errors become
    /// the fallback reply.
    pub async fn answer_or_fallback(&self, input: &ChatInput) -> String {
        match self.answer(input).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(status = ?err.status(), "upstream completion failed: {err}");
                self.fallback().to_string()
            }
        }
    }
}
