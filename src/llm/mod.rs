//! LLM Layer
//!
//! Everything between a validated chat request and the raw reply text:
//! - Provider abstraction and the OpenAI-compatible HTTP provider
//! - Conversation window assembly
//! - Invocation with a single rate-limit retry

pub mod types;
pub mod provider;
pub mod context;
pub mod openai;
pub mod invoker;

// Re-export key types
pub use types::{Message, Role, CompletionResponse, SamplingParams, Usage};
pub use provider::{LLMProvider, ModelMetadata};
pub use context::{build_window, parse_history, ChatTurn, WINDOW_SIZE};
pub use openai::OpenAIProvider;
pub use invoker::{CompletionInvoker, RetryDecision, RetryPolicy};
