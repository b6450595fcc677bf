//! Completion invocation with a single rate-limit retry.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::provider::LLMProvider;
use super::types::Message;
use crate::error::{CompletionError, ErrorKind};

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Retry policy for upstream calls: transient failures get `max_retries`
/// extra attempts, each after a fixed backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::from_millis(800),
        }
    }
}

impl RetryPolicy {
    pub fn with_backoff(backoff: Duration) -> Self {
        Self {
            backoff,
            ..Self::default()
        }
    }

    /// Decide after `attempts` calls have been made and the last one failed with `error`.
    pub fn decide(&self, attempts: u32, error: &CompletionError) -> RetryDecision {
        match error.kind() {
            ErrorKind::Transient if attempts <= self.max_retries => {
                RetryDecision::RetryAfter(self.backoff)
            }
            _ => RetryDecision::GiveUp,
        }
    }
}

/// Calls the provider and turns its answer into reply text.
pub struct CompletionInvoker {
    provider: Arc<dyn LLMProvider>,
    retry: RetryPolicy,
    fallback: String,
}

impl CompletionInvoker {
    pub fn new(provider: Arc<dyn LLMProvider>, retry: RetryPolicy, fallback: impl Into<String>) -> Self {
        Self {
            provider,
            retry,
            fallback: fallback.into(),
        }
    }

    pub fn provider(&self) -> &dyn LLMProvider {
        self.provider.as_ref()
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Run the completion. Returns the trimmed reply, or the fallback when the
    /// provider answered with nothing.
    pub async fn invoke(&self, messages: &[Message]) -> Result<String, CompletionError> {
        let mut attempts = 0;
        let response = loop {
            attempts += 1;
            match self.provider.completion(messages).await {
                Ok(response) => break response,
                Err(err) => match self.retry.decide(attempts, &err) {
                    RetryDecision::RetryAfter(delay) => {
                        warn!(attempt = attempts, delay_ms = delay.as_millis() as u64, "{err}; retrying");
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::GiveUp => return Err(err),
                },
            }
        };

        debug!(
            attempts,
            completion_tokens = response.usage.completion_tokens,
            "completion received"
        );

        let text = response.content.trim();
        if text.is_empty() {
            Ok(self.fallback.clone())
        } else {
            Ok(text.to_string())
        }
    }
}
