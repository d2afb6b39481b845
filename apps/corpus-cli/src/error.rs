//! Error types for the corpus CLI

use corpus_core::{ConfigError, QueryError, StoreReadError, TableError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid usage: {0}")]
    Usage(String),

    #[error("{0}")]
    Query(#[from] QueryError),

    #[error("Failed to read corpus: {0}")]
    Store(#[from] StoreReadError),

    #[error("Failed to read source table: {0}")]
    Table(#[from] TableError),

    /// Run finished but some rows or batches were not stored
    #[error("Run incomplete: {0}")]
    Incomplete(String),

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    /// Process exit status for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Internal(_) => 1,
            CliError::Config(_) | CliError::Usage(_) => 2,
            CliError::Query(QueryError::InvalidTopK) => 2,
            CliError::Query(QueryError::QueryEmbedding(_)) => 3,
            CliError::Query(QueryError::Store(_)) | CliError::Store(_) => 4,
            CliError::Query(QueryError::Rank(_)) => 5,
            CliError::Incomplete(_) => 6,
            CliError::Table(_) => 7,
        }
    }
}
