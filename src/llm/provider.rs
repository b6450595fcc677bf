//! The Provider Abstraction.
//!
//! Any chat-completion backend the invoker can call, whether the real
//! OpenAI-compatible HTTP API or an in-process double in tests.

use async_trait::async_trait;

use super::types::{CompletionResponse, Message};
use crate::error::CompletionError;

/// Metadata about the configured model.
#[derive(Debug, Clone)]
pub struct ModelMetadata {
    /// Provider name as configured (e.g. "groq")
    pub provider: String,
    pub id: String,
}

/// The core trait for LLM interactions.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Get the provider and model identity.
    fn metadata(&self) -> ModelMetadata;

    /// Send one chat completion request. Implementations must not retry.
    async fn completion(&self, messages: &[Message]) -> Result<CompletionResponse, CompletionError>;
}
