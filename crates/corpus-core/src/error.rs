//! Error taxonomy shared by the retrieval pipeline
//!
//! Ingestion recovers from provider and store errors per row / per batch and
//! folds them into its run summary. The query path has a single unit of work,
//! so everything it hits is surfaced through [`QueryError`].

use thiserror::Error;

/// Failure reported by an embedding provider
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmbeddingProviderError {
    /// Connection could not be established or was dropped
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider did not answer within the configured timeout
    #[error("Embedding request timed out")]
    Timeout,

    /// The provider answered with a non-success status (auth, quota, bad request)
    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// The provider answered with a zero-length vector
    #[error("Provider returned an empty embedding")]
    EmptyEmbedding,
}

/// A corpus item whose vector has zero norm and therefore no cosine similarity
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Item {id} has a zero-norm vector")]
pub struct DegenerateVectorError {
    pub id: i64,
}

/// Conditions that fail a whole ranking pass
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RankError {
    /// The corpus violates the fixed-dimension invariant
    #[error("Dimension mismatch for item {id}: expected {expected}, got {actual}")]
    DimensionMismatch {
        id: i64,
        expected: usize,
        actual: usize,
    },

    /// The query vector itself has zero norm
    #[error("Query vector has zero norm")]
    DegenerateQuery,
}

/// Failure while writing a batch to a vector store
#[derive(Debug, Error)]
pub enum StoreWriteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// The backing store refused the batch (constraint violation, auth, payload size)
    #[error("Store rejected write ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The store enforces id uniqueness and the id already exists
    #[error("Duplicate id: {0}")]
    DuplicateId(i64),
}

/// Failure while reading the corpus from a vector store
#[derive(Debug, Error)]
pub enum StoreReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed stored data: {0}")]
    Malformed(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Store rejected read ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Errors surfaced by the query pipeline
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Failed to embed query: {0}")]
    QueryEmbedding(#[source] EmbeddingProviderError),

    #[error("Failed to read corpus: {0}")]
    Store(#[from] StoreReadError),

    #[error("Ranking failed: {0}")]
    Rank(#[from] RankError),

    #[error("top_k must be greater than zero")]
    InvalidTopK,
}
