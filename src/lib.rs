//! MimiChat: a storefront chat proxy in front of OpenAI-compatible
//! completion APIs.
//!
//! A request flows through the conversation window builder, the completion
//! invoker (one retry on rate limiting) and the address-term rewriter before
//! the reply goes back to the widget.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod persona;
pub mod rewrite;
pub mod server;

pub use chat::{ChatInput, ChatPipeline};
pub use config::{Config, Provider};
pub use error::{CompletionError, ErrorKind};
pub use llm::{
    ChatTurn, CompletionInvoker, CompletionResponse, LLMProvider, Message, ModelMetadata,
    OpenAIProvider, RetryDecision, RetryPolicy, Role,
};
pub use rewrite::{segment_sentences, AddressRewriter, AddressTerms, SentenceSplitter};
pub use server::{router, serve, AppState, SharedState};
