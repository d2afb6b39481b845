//! Id → display label lookup
//!
//! Labels are loaded separately from vectors (usually from the same source
//! table ingestion read), so some ids may have none. A missing label is never
//! an error; it resolves to [`UNKNOWN_LABEL`].

use std::collections::HashMap;

use crate::item::{SourceRow, UNKNOWN_LABEL};

#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    labels: HashMap<i64, String>,
}

impl LabelMap {
    pub fn from_rows(rows: impl IntoIterator<Item = SourceRow>) -> Self {
        rows.into_iter().map(|row| (row.id, row.title)).collect()
    }

    pub fn insert(&mut self, id: i64, label: impl Into<String>) {
        self.labels.insert(id, label.into());
    }

    pub fn get(&self, id: i64) -> Option<&str> {
        self.labels.get(&id).map(String::as_str)
    }

    /// Label for `id`, or the placeholder when there is none
    pub fn label_for(&self, id: i64) -> &str {
        self.get(id).unwrap_or(UNKNOWN_LABEL)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl FromIterator<(i64, String)> for LabelMap {
    fn from_iter<I: IntoIterator<Item = (i64, String)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}
