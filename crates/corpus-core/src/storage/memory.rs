use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{StoreReadError, StoreWriteError};
use crate::item::VectorRecord;
use crate::storage::VectorStore;

/// In-process store, optionally enforcing id uniqueness
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<VectorRecord>>,
    unique_ids: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing corpus
    pub fn with_records(records: Vec<VectorRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            unique_ids: false,
        }
    }

    /// Reject batches containing an id that is already stored
    pub fn with_unique_ids(mut self) -> Self {
        self.unique_ids = true;
        self
    }

    /// Snapshot of the stored records
    pub fn records(&self) -> Vec<VectorRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<VectorRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn append_batch(&self, items: &[VectorRecord]) -> Result<(), StoreWriteError> {
        let mut records = self.lock();

        if self.unique_ids {
            // all-or-nothing: check the whole batch before writing any of it
            let mut seen: HashSet<i64> = records.iter().map(|r| r.id).collect();
            if let Some(dup) = items.iter().find(|r| !seen.insert(r.id)) {
                return Err(StoreWriteError::DuplicateId(dup.id));
            }
        }

        records.extend_from_slice(items);
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<VectorRecord>, StoreReadError> {
        Ok(self.records())
    }

    fn describe(&self) -> String {
        "in-memory store".to_string()
    }
}
