//! Corpus Core - Embedding-based semantic search over a title corpus
//!
//! This crate provides:
//! - Item, source row and ranked result types
//! - The embedding provider trait and a Gemini `embedContent` client
//! - Append-only vector stores (JSON artifact, PostgREST table, in-memory)
//! - Brute-force cosine similarity ranking
//! - Ingestion and bulk-load pipelines with per-row / per-batch failure isolation
//! - The query pipeline with label joining
//! - Configuration management

pub mod config;
pub mod embeddings;
pub mod error;
pub mod ingest;
pub mod item;
pub mod labels;
pub mod search;
pub mod storage;
pub mod table;

// Re-export commonly used types
pub use config::{ConfigError, CorpusConfig, StoreBackend};
pub use embeddings::{EmbeddingMode, EmbeddingProvider, GeminiEmbedder};
pub use error::{
    DegenerateVectorError, EmbeddingProviderError, QueryError, RankError, StoreReadError,
    StoreWriteError,
};
pub use ingest::{BulkLoader, IngestSummary, IngestionPipeline, LoadSummary};
pub use item::{RankedResult, SourceRow, VectorRecord, UNKNOWN_LABEL};
pub use labels::LabelMap;
pub use search::{QueryOutcome, QueryPipeline};
pub use storage::VectorStore;
pub use table::{read_source_table, TableError};
