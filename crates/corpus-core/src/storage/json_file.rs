//! Vector artifact on the local filesystem
//!
//! The artifact is a JSON array of `{"id": <int>, "vector": [<float>...]}`.
//! Appending rewrites the file through a sibling temp file and a rename, so an
//! interrupted write leaves the previous artifact intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{StoreReadError, StoreWriteError};
use crate::item::VectorRecord;
use crate::storage::VectorStore;

/// Corpus stored as a single JSON file
pub struct JsonFileStore {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<VectorRecord>, StoreReadError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            StoreReadError::Malformed(format!("{}: {}", self.path.display(), e))
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Write `contents` to `temp`, then rename it over `path`
///
/// On failure the temp file is removed and `path` is left as it was.
async fn replace_file(path: &Path, temp: &Path, contents: &[u8]) -> std::io::Result<()> {
    let result = match tokio::fs::write(temp, contents).await {
        Ok(()) => tokio::fs::rename(temp, path).await,
        Err(e) => Err(e),
    };

    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(temp).await {
            tracing::warn!(path = %temp.display(), error = %e, "Failed to remove temp file");
        }
    }
    result
}

#[async_trait]
impl VectorStore for JsonFileStore {
    async fn append_batch(&self, items: &[VectorRecord]) -> Result<(), StoreWriteError> {
        if items.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;

        let mut records = self.load().await.map_err(|e| match e {
            StoreReadError::Io(io) => StoreWriteError::Io(io),
            other => StoreWriteError::Serialization(other.to_string()),
        })?;
        records.extend_from_slice(items);

        let json = serde_json::to_vec_pretty(&records)
            .map_err(|e| StoreWriteError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        replace_file(&self.path, &self.temp_path(), &json).await?;

        tracing::debug!(
            path = %self.path.display(),
            appended = items.len(),
            total = records.len(),
            "Vector artifact updated"
        );
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<VectorRecord>, StoreReadError> {
        self.load().await
    }

    fn describe(&self) -> String {
        format!("json file {}", self.path.display())
    }
}
