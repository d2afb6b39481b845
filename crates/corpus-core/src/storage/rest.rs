//! PostgREST-style table holding the corpus
//!
//! Writes are a single `POST /rest/v1/{table}` per batch with a JSON array of
//! rows. Reads page through the table with `limit`/`offset` ordered by id.
//! Uniqueness, if any, is enforced by the table itself and surfaces as
//! [`StoreWriteError::Rejected`].

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{StoreReadError, StoreWriteError};
use crate::item::VectorRecord;
use crate::storage::VectorStore;

pub const DEFAULT_ID_COLUMN: &str = "research_paper_id";
pub const DEFAULT_VECTOR_COLUMN: &str = "embedding";
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Vector table behind a PostgREST endpoint
pub struct RestTableStore {
    client: reqwest::Client,
    url: String,
    table: String,
    api_key: Option<String>,
    id_column: String,
    vector_column: String,
    page_size: usize,
}

impl RestTableStore {
    pub fn new(
        url: impl Into<String>,
        table: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            table: table.into(),
            api_key: None,
            id_column: DEFAULT_ID_COLUMN.to_string(),
            vector_column: DEFAULT_VECTOR_COLUMN.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Key sent as both `apikey` and bearer token
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    pub fn with_columns(
        mut self,
        id_column: impl Into<String>,
        vector_column: impl Into<String>,
    ) -> Self {
        self.id_column = id_column.into();
        self.vector_column = vector_column.into();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.url.trim_end_matches('/'), self.table)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    fn encode_rows(&self, items: &[VectorRecord]) -> Vec<Value> {
        items
            .iter()
            .map(|record| {
                let mut row = Map::new();
                row.insert(self.id_column.clone(), Value::from(record.id));
                row.insert(self.vector_column.clone(), Value::from(record.vector.clone()));
                Value::Object(row)
            })
            .collect()
    }

    fn decode_row(&self, row: &Map<String, Value>) -> Result<VectorRecord, StoreReadError> {
        let id = row
            .get(&self.id_column)
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                StoreReadError::Malformed(format!("row without integer `{}`", self.id_column))
            })?;

        let vector = match row.get(&self.vector_column) {
            Some(Value::Array(values)) => values
                .iter()
                .map(|v| v.as_f64().map(|f| f as f32))
                .collect::<Option<Vec<f32>>>()
                .ok_or_else(|| {
                    StoreReadError::Malformed(format!("non-numeric vector value for id {}", id))
                })?,
            Some(Value::String(text)) => parse_vector_literal(text).ok_or_else(|| {
                StoreReadError::Malformed(format!("unparseable vector literal for id {}", id))
            })?,
            _ => {
                return Err(StoreReadError::Malformed(format!(
                    "row {} has no `{}` column",
                    id, self.vector_column
                )))
            }
        };

        Ok(VectorRecord { id, vector })
    }
}

/// Parse a pgvector text literal such as `[0.1,0.2,-0.3]`
fn parse_vector_literal(text: &str) -> Option<Vec<f32>> {
    let inner = text.trim().strip_prefix('[')?.strip_suffix(']')?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    inner
        .split(',')
        .map(|part| part.trim().parse::<f32>().ok())
        .collect()
}

/// Offset of the next page, or `None` once the table is exhausted
///
/// The server may cap a page below the requested `limit` (PostgREST
/// `max-rows`), so a short page does not mean the end; only an empty one does.
fn next_page_offset(offset: usize, fetched: usize) -> Option<usize> {
    (fetched > 0).then_some(offset + fetched)
}

fn rejected_message(body: String) -> String {
    serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body)
}

#[async_trait]
impl VectorStore for RestTableStore {
    async fn append_batch(&self, items: &[VectorRecord]) -> Result<(), StoreWriteError> {
        if items.is_empty() {
            return Ok(());
        }

        let request = self
            .client
            .post(self.endpoint())
            .header("Prefer", "return=minimal")
            .json(&self.encode_rows(items));

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| StoreWriteError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreWriteError::Rejected {
                status: status.as_u16(),
                message: rejected_message(body),
            });
        }
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<VectorRecord>, StoreReadError> {
        let select = format!("{},{}", self.id_column, self.vector_column);
        let order = format!("{}.asc", self.id_column);
        let mut records = Vec::new();
        let limit = self.page_size.to_string();
        let mut offset = 0usize;

        loop {
            let request = self.client.get(self.endpoint()).query(&[
                ("select", select.as_str()),
                ("order", order.as_str()),
                ("limit", limit.as_str()),
                ("offset", offset.to_string().as_str()),
            ]);

            let response = self
                .authorize(request)
                .send()
                .await
                .map_err(|e| StoreReadError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(StoreReadError::Rejected {
                    status: status.as_u16(),
                    message: rejected_message(body),
                });
            }

            let rows: Vec<Map<String, Value>> = response
                .json()
                .await
                .map_err(|e| StoreReadError::Malformed(e.to_string()))?;

            let fetched = rows.len();
            for row in &rows {
                records.push(self.decode_row(row)?);
            }

            tracing::debug!(offset, fetched, "Fetched corpus page");
            match next_page_offset(offset, fetched) {
                Some(next) => offset = next,
                None => break,
            }
        }

        Ok(records)
    }

    fn describe(&self) -> String {
        format!("rest table {} at {}", self.table, self.url)
    }
}
