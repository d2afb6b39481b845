//! Query pipeline
//!
//! A query is one unit of work: if the provider cannot embed the query text,
//! the store cannot be read, or the corpus cannot be ranked, the whole query
//! fails. An empty corpus is not a failure and yields no results.
//!
//! # Example
//!
//! ```rust,no_run
//! use corpus_core::embeddings::GeminiEmbedder;
//! use corpus_core::labels::LabelMap;
//! use corpus_core::search::QueryPipeline;
//! use corpus_core::storage::JsonFileStore;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let provider = GeminiEmbedder::new("key", "gemini-embedding-001", Duration::from_secs(30))?;
//! let store = JsonFileStore::new("title_vectors.json");
//! let labels = LabelMap::default();
//!
//! let outcome = QueryPipeline::new(&provider, &store, &labels)
//!     .search("microbial life in hydrothermal vents", 5)
//!     .await?;
//! for hit in outcome.results {
//!     println!("{} {:.4} {}", hit.id, hit.score, hit.label);
//! }
//! # Ok(())
//! # }
//! ```

use tracing::{debug, info};

use crate::embeddings::{EmbeddingMode, EmbeddingProvider};
use crate::error::{DegenerateVectorError, QueryError};
use crate::item::RankedResult;
use crate::labels::LabelMap;
use crate::search::similarity::rank;
use crate::storage::VectorStore;

/// Number of results returned when the caller does not ask for a specific count
pub const DEFAULT_TOP_K: usize = 5;

/// Answer to a single query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutcome {
    /// Best matches first, at most `top_k`
    pub results: Vec<RankedResult>,
    /// Corpus items that could not be scored
    pub skipped: Vec<DegenerateVectorError>,
}

/// Embeds a query and ranks the whole corpus against it
pub struct QueryPipeline<'a> {
    provider: &'a dyn EmbeddingProvider,
    store: &'a dyn VectorStore,
    labels: &'a LabelMap,
}

impl<'a> QueryPipeline<'a> {
    pub fn new(
        provider: &'a dyn EmbeddingProvider,
        store: &'a dyn VectorStore,
        labels: &'a LabelMap,
    ) -> Self {
        Self {
            provider,
            store,
            labels,
        }
    }

    /// Return the `top_k` corpus items most similar to `text`
    ///
    /// # Errors
    ///
    /// - [`QueryError::InvalidTopK`] if `top_k` is zero
    /// - [`QueryError::QueryEmbedding`] if the provider fails
    /// - [`QueryError::Store`] if the corpus cannot be read
    /// - [`QueryError::Rank`] if the corpus violates the dimension invariant
    ///   or the query vector has zero norm
    pub async fn search(&self, text: &str, top_k: usize) -> Result<QueryOutcome, QueryError> {
        if top_k == 0 {
            return Err(QueryError::InvalidTopK);
        }

        info!(query = text, top_k, "Searching");

        let query_vector = self
            .provider
            .embed(text, EmbeddingMode::Query)
            .await
            .map_err(QueryError::QueryEmbedding)?;

        let corpus = self.store.read_all().await?;
        debug!(
            corpus = corpus.len(),
            dimensions = query_vector.len(),
            "Ranking corpus"
        );

        let ranking = rank(&query_vector, &corpus)?;

        let results = ranking
            .results
            .into_iter()
            .take(top_k)
            .map(|hit| RankedResult {
                id: hit.id,
                score: hit.score,
                label: self.labels.label_for(hit.id).to_string(),
            })
            .collect();

        Ok(QueryOutcome {
            results,
            skipped: ranking.degenerate,
        })
    }
}
