use serde::{Deserialize, Serialize};

/// Label substituted when an id has no entry in the label source
pub const UNKNOWN_LABEL: &str = "Unknown Title";

/// One persisted embedding, keyed by item id
///
/// This is also the element type of the vector artifact
/// (`[{"id": 1, "vector": [...]}, ...]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: i64,
    pub vector: Vec<f32>,
}

impl VectorRecord {
    pub fn new(id: i64, vector: Vec<f32>) -> Self {
        Self { id, vector }
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// A row of the source table fed to ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRow {
    pub id: i64,
    pub title: String,
}

impl SourceRow {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

/// A ranked hit joined with its display label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub id: i64,
    pub score: f32,
    pub label: String,
}
