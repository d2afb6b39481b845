//! Per-run application state
//!
//! Holds the resolved configuration and the vector store every command uses.
//! The embedding provider is only built by the commands that need it, so
//! `load` works without an API key.

use std::sync::Arc;

use corpus_core::{CorpusConfig, EmbeddingProvider, VectorStore};
use tracing::info;

use crate::error::CliError;

pub struct AppState {
    pub config: CorpusConfig,
    pub store: Arc<dyn VectorStore>,
}

impl AppState {
    /// Validate `config` and connect the configured store
    pub fn new(config: CorpusConfig) -> Result<Self, CliError> {
        config.validate()?;

        let store = config.store.build_store()?;
        info!("Using {}", store.describe());

        Ok(Self { config, store })
    }

    pub fn provider(&self) -> Result<Arc<dyn EmbeddingProvider>, CliError> {
        let provider = self.config.embedding.build_provider()?;
        info!("Embedding with {}", provider.name());
        Ok(provider)
    }
}
