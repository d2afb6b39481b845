use serde::Serialize;
use tracing::{info, warn};

use crate::item::VectorRecord;
use crate::storage::VectorStore;

/// Default number of records per store write
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// A batch the store refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    /// 1-based batch number
    pub batch: usize,
    pub size: usize,
    pub reason: String,
}

/// Outcome of flushing staged records to a store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub batches_written: usize,
    pub items_written: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn batches_failed(&self) -> usize {
        self.failures.len()
    }
}

/// Write `items` to `store` in chunks of `batch_size`
///
/// A failed batch is recorded and the remaining batches are still attempted.
/// Nothing is retried.
pub async fn flush_batches(
    store: &dyn VectorStore,
    items: &[VectorRecord],
    batch_size: usize,
) -> BatchReport {
    let batch_size = batch_size.max(1);
    let total = items.len().div_ceil(batch_size);
    let mut report = BatchReport::default();

    for (index, chunk) in items.chunks(batch_size).enumerate() {
        let batch = index + 1;
        match store.append_batch(chunk).await {
            Ok(()) => {
                info!(batch, total, size = chunk.len(), "Batch written");
                report.batches_written += 1;
                report.items_written += chunk.len();
            }
            Err(e) => {
                warn!(batch, total, size = chunk.len(), error = %e, "Batch write failed");
                report.failures.push(BatchFailure {
                    batch,
                    size: chunk.len(),
                    reason: e.to_string(),
                });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreReadError, StoreWriteError};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Records write sizes and fails the batch numbers it is told to
    #[derive(Default)]
    struct RecordingStore {
        writes: Mutex<Vec<usize>>,
        fail_batches: Vec<usize>,
    }

    #[async_trait]
    impl VectorStore for RecordingStore {
        async fn append_batch(&self, items: &[VectorRecord]) -> Result<(), StoreWriteError> {
            let mut writes = self.writes.lock().unwrap();
            writes.push(items.len());
            if self.fail_batches.contains(&writes.len()) {
                return Err(StoreWriteError::Rejected {
                    status: 413,
                    message: "payload too large".to_string(),
                });
            }
            Ok(())
        }

        async fn read_all(&self) -> Result<Vec<VectorRecord>, StoreReadError> {
            Ok(Vec::new())
        }

        fn describe(&self) -> String {
            "recording".to_string()
        }
    }

    fn records(n: usize) -> Vec<VectorRecord> {
        (0..n as i64).map(|id| VectorRecord::new(id, vec![1.0, 0.0])).collect()
    }

    #[tokio::test]
    async fn test_chunks_250_into_100_100_50() {
        let store = RecordingStore::default();
        let report = flush_batches(&store, &records(250), 100).await;

        assert_eq!(*store.writes.lock().unwrap(), vec![100, 100, 50]);
        assert_eq!(report.batches_written, 3);
        assert_eq!(report.items_written, 250);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_abort_the_rest() {
        let store = RecordingStore {
            fail_batches: vec![2],
            ..Default::default()
        };
        let report = flush_batches(&store, &records(250), 100).await;

        assert_eq!(store.writes.lock().unwrap().len(), 3);
        assert_eq!(report.batches_written, 2);
        assert_eq!(report.items_written, 150);
        assert_eq!(
            report.failures,
            vec![BatchFailure {
                batch: 2,
                size: 100,
                reason: "Store rejected write (413): payload too large".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_nothing_staged_means_no_writes() {
        let store = RecordingStore::default();
        let report = flush_batches(&store, &[], 100).await;
        assert!(store.writes.lock().unwrap().is_empty());
        assert_eq!(report, BatchReport::default());
    }
}
