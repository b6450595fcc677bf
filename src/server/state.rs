//! Server application state

use std::sync::Arc;

use anyhow::Result;

use crate::chat::ChatPipeline;
use crate::config::Config;
use crate::llm::LLMProvider;

/// Shared application state for all route handlers. Read-only after startup.
pub struct AppState {
    pub config: Config,
    pub pipeline: ChatPipeline,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// State backed by the configured upstream provider
    pub fn from_config(config: Config) -> Result<SharedState> {
        let pipeline = ChatPipeline::from_config(&config)?;
        Ok(Arc::new(Self { config, pipeline }))
    }

    /// State backed by an arbitrary provider
    pub fn with_provider(config: Config, provider: Arc<dyn LLMProvider>) -> Result<SharedState> {
        let pipeline = ChatPipeline::with_provider(&config, provider)?;
        Ok(Arc::new(Self { config, pipeline }))
    }
}
