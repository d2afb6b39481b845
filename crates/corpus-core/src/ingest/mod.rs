//! Ingestion: source rows → embeddings → batched store writes
//!
//! Failures are isolated: a row whose embedding fails is recorded and skipped,
//! a batch the store refuses is recorded and the next batch is still written.
//! The run always finishes with an [`IngestSummary`]. Nothing is retried.

pub mod batch;
pub mod loader;

pub use batch::{flush_batches, BatchFailure, BatchReport, DEFAULT_BATCH_SIZE};
pub use loader::{BulkLoader, LoadSummary};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use crate::embeddings::{EmbeddingMode, EmbeddingProvider};
use crate::item::{SourceRow, VectorRecord};
use crate::storage::VectorStore;

/// A row that could not be embedded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    pub id: i64,
    pub reason: String,
}

/// Result of an ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub rows_embedded: usize,
    pub row_failures: Vec<RowFailure>,
    pub batches: BatchReport,
}

impl IngestSummary {
    pub fn rows_failed(&self) -> usize {
        self.row_failures.len()
    }

    /// True when every row was embedded and every batch written
    pub fn is_clean(&self) -> bool {
        self.row_failures.is_empty() && self.batches.failures.is_empty()
    }
}

/// Embeds source rows in document mode and persists them
pub struct IngestionPipeline<'a> {
    provider: &'a dyn EmbeddingProvider,
    store: &'a dyn VectorStore,
    batch_size: usize,
    concurrency: usize,
    dimension: Option<usize>,
}

impl<'a> IngestionPipeline<'a> {
    pub fn new(provider: &'a dyn EmbeddingProvider, store: &'a dyn VectorStore) -> Self {
        Self {
            provider,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: 1,
            dimension: None,
        }
    }

    /// Records per store write (clamped to at least 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Rows embedded at once; results are still staged in input order
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Expected vector length; by default the first embedded row fixes it
    pub fn with_dimension(mut self, dimension: Option<usize>) -> Self {
        self.dimension = dimension;
        self
    }

    pub async fn run(&self, rows: &[SourceRow]) -> IngestSummary {
        info!(
            rows = rows.len(),
            provider = self.provider.name(),
            store = %self.store.describe(),
            "Starting ingestion"
        );

        let mut summary = IngestSummary::default();
        let staged = self.embed_rows(rows, &mut summary).await;
        summary.batches = flush_batches(self.store, &staged, self.batch_size).await;

        info!(
            embedded = summary.rows_embedded,
            failed = summary.rows_failed(),
            batches_written = summary.batches.batches_written,
            batches_failed = summary.batches.batches_failed(),
            "Ingestion finished"
        );
        summary
    }

    async fn embed_rows(
        &self,
        rows: &[SourceRow],
        summary: &mut IngestSummary,
    ) -> Vec<VectorRecord> {
        let provider = self.provider;
        let mut outcomes = stream::iter(rows)
            .map(|row| async move {
                let outcome = provider.embed(&row.title, EmbeddingMode::Document).await;
                (row.id, outcome)
            })
            .buffered(self.concurrency);

        let mut dimension = self.dimension;
        let mut staged = Vec::with_capacity(rows.len());

        while let Some((id, outcome)) = outcomes.next().await {
            let vector = match outcome {
                Ok(vector) => vector,
                Err(e) => {
                    warn!(id, error = %e, "Failed to embed row");
                    summary.row_failures.push(RowFailure {
                        id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let expected = *dimension.get_or_insert(vector.len());
            if vector.len() != expected {
                warn!(id, expected, actual = vector.len(), "Embedding has wrong dimension");
                summary.row_failures.push(RowFailure {
                    id,
                    reason: format!(
                        "Dimension mismatch: expected {}, got {}",
                        expected,
                        vector.len()
                    ),
                });
                continue;
            }

            info!(id, dimensions = vector.len(), "Embedded row");
            summary.rows_embedded += 1;
            staged.push(VectorRecord { id, vector });
        }

        staged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbeddingProviderError;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    /// Returns canned vectors per text; unknown texts fail with a quota error
    struct CannedProvider {
        vectors: HashMap<&'static str, Vec<f32>>,
    }

    #[async_trait]
    impl EmbeddingProvider for CannedProvider {
        async fn embed(
            &self,
            text: &str,
            mode: EmbeddingMode,
        ) -> Result<Vec<f32>, EmbeddingProviderError> {
            assert_eq!(mode, EmbeddingMode::Document);
            self.vectors
                .get(text)
                .cloned()
                .ok_or_else(|| EmbeddingProviderError::Api {
                    status: 429,
                    message: "Quota exceeded".to_string(),
                })
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn provider(entries: &[(&'static str, Vec<f32>)]) -> CannedProvider {
        CannedProvider {
            vectors: entries.iter().cloned().collect(),
        }
    }

    #[tokio::test]
    async fn test_failed_row_is_isolated() {
        let provider = provider(&[("A", vec![1.0, 0.0])]);
        let store = MemoryStore::new();
        let rows = vec![SourceRow::new(1, "A"), SourceRow::new(2, "B")];

        let summary = IngestionPipeline::new(&provider, &store).run(&rows).await;

        assert_eq!(summary.rows_embedded, 1);
        assert_eq!(
            summary.row_failures,
            vec![RowFailure {
                id: 2,
                reason: "Provider returned 429: Quota exceeded".to_string(),
            }]
        );
        assert_eq!(store.records(), vec![VectorRecord::new(1, vec![1.0, 0.0])]);
        assert!(!summary.is_clean());
    }

    #[tokio::test]
    async fn test_dimension_guard_rejects_odd_vector() {
        let provider = provider(&[
            ("A", vec![1.0, 0.0]),
            ("B", vec![1.0, 0.0, 0.0]),
            ("C", vec![0.0, 1.0]),
        ]);
        let store = MemoryStore::new();
        let rows = vec![
            SourceRow::new(1, "A"),
            SourceRow::new(2, "B"),
            SourceRow::new(3, "C"),
        ];

        let summary = IngestionPipeline::new(&provider, &store).run(&rows).await;

        assert_eq!(summary.rows_embedded, 2);
        assert_eq!(summary.row_failures.len(), 1);
        assert_eq!(summary.row_failures[0].id, 2);
        let ids: Vec<i64> = store.records().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_configured_dimension_applies_to_first_row() {
        let provider = provider(&[("A", vec![1.0, 0.0])]);
        let store = MemoryStore::new();

        let summary = IngestionPipeline::new(&provider, &store)
            .with_dimension(Some(3))
            .run(&[SourceRow::new(1, "A")])
            .await;

        assert_eq!(summary.rows_embedded, 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_embedding_keeps_input_order() {
        let entries: Vec<(&'static str, Vec<f32>)> = vec![
            ("one", vec![1.0]),
            ("two", vec![2.0]),
            ("three", vec![3.0]),
            ("four", vec![4.0]),
        ];
        let provider = provider(&entries);
        let store = MemoryStore::new();
        let rows: Vec<SourceRow> = entries
            .iter()
            .enumerate()
            .map(|(i, (text, _))| SourceRow::new(i as i64 + 1, *text))
            .collect();

        let summary = IngestionPipeline::new(&provider, &store)
            .with_concurrency(3)
            .with_batch_size(3)
            .run(&rows)
            .await;

        assert!(summary.is_clean());
        assert_eq!(summary.batches.batches_written, 2);
        let ids: Vec<i64> = store.records().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_duplicate_batch_is_reported_not_fatal() {
        let provider = provider(&[("A", vec![1.0]), ("B", vec![0.5])]);
        let store =
            MemoryStore::with_records(vec![VectorRecord::new(1, vec![1.0])]).with_unique_ids();
        let rows = vec![SourceRow::new(1, "A"), SourceRow::new(2, "B")];

        let summary = IngestionPipeline::new(&provider, &store)
            .with_batch_size(1)
            .run(&rows)
            .await;

        assert_eq!(summary.rows_embedded, 2);
        assert_eq!(summary.batches.batches_written, 1);
        assert_eq!(summary.batches.failures.len(), 1);
        assert_eq!(summary.batches.failures[0].batch, 1);
        assert_eq!(store.len(), 2);
    }
}
