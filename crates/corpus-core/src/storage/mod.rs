//! Vector storage for the corpus
//!
//! Stores are append-only: ingestion writes batches of `{id, vector}` records
//! and the query path reads the whole corpus back. There is no per-item
//! update or delete, and batching is left to the caller.

pub mod json_file;
pub mod memory;
pub mod rest;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use rest::RestTableStore;

use async_trait::async_trait;

use crate::error::{StoreReadError, StoreWriteError};
use crate::item::VectorRecord;

/// Append-only mapping from item id to embedding
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Persist one batch of records
    ///
    /// A failure applies to the whole batch; stores make no promise about
    /// partially written batches beyond what the backend itself guarantees.
    async fn append_batch(&self, items: &[VectorRecord]) -> Result<(), StoreWriteError>;

    /// Read every record currently in the store
    async fn read_all(&self) -> Result<Vec<VectorRecord>, StoreReadError>;

    /// Short description for logs
    fn describe(&self) -> String;
}
