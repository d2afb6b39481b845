use serde::Serialize;
use tracing::info;

use crate::error::StoreReadError;
use crate::ingest::batch::{flush_batches, BatchReport, DEFAULT_BATCH_SIZE};
use crate::storage::VectorStore;

/// Result of copying a corpus between stores
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub records_read: usize,
    pub batches: BatchReport,
}

impl LoadSummary {
    pub fn is_clean(&self) -> bool {
        self.batches.failures.is_empty()
    }
}

/// Copies an existing corpus (usually the vector artifact) into another store
pub struct BulkLoader {
    batch_size: usize,
}

impl Default for BulkLoader {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl BulkLoader {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Read all of `source` and append it to `target` batch by batch
    ///
    /// Failing to read the source fails the load; failing batches do not.
    pub async fn load(
        &self,
        source: &dyn VectorStore,
        target: &dyn VectorStore,
    ) -> Result<LoadSummary, StoreReadError> {
        let records = source.read_all().await?;
        info!(
            records = records.len(),
            from = %source.describe(),
            to = %target.describe(),
            "Loading corpus"
        );

        let batches = flush_batches(target, &records, self.batch_size).await;
        Ok(LoadSummary {
            records_read: records.len(),
            batches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::VectorRecord;
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_copies_every_record() {
        let records: Vec<VectorRecord> = (1..=5)
            .map(|id| VectorRecord::new(id, vec![id as f32, 1.0]))
            .collect();
        let source = MemoryStore::with_records(records.clone());
        let target = MemoryStore::new();

        let summary = BulkLoader::new(2).load(&source, &target).await.unwrap();

        assert_eq!(summary.records_read, 5);
        assert_eq!(summary.batches.batches_written, 3);
        assert!(summary.is_clean());
        assert_eq!(target.records(), records);
    }

    #[tokio::test]
    async fn test_rejected_batches_are_reported() {
        let source = MemoryStore::with_records(vec![
            VectorRecord::new(1, vec![1.0]),
            VectorRecord::new(2, vec![1.0]),
        ]);
        let target =
            MemoryStore::with_records(vec![VectorRecord::new(2, vec![0.0])]).with_unique_ids();

        let summary = BulkLoader::new(1).load(&source, &target).await.unwrap();

        assert_eq!(summary.batches.batches_written, 1);
        assert_eq!(summary.batches.failures.len(), 1);
        assert_eq!(summary.batches.failures[0].batch, 2);
        assert!(!summary.is_clean());
    }
}
