//! Configuration management for the corpus pipelines
//!
//! Settings are read from an optional TOML file and then overridden by
//! environment variables. The config also knows how to build the concrete
//! embedding provider and vector store it describes.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::embeddings::{
    EmbeddingProvider, GeminiEmbedder, DEFAULT_BASE_URL, DEFAULT_DOCUMENT_TITLE, DEFAULT_MODEL,
};
use crate::ingest::DEFAULT_BATCH_SIZE;
use crate::search::DEFAULT_TOP_K;
use crate::storage::rest::{DEFAULT_ID_COLUMN, DEFAULT_PAGE_SIZE, DEFAULT_VECTOR_COLUMN};
use crate::storage::{JsonFileStore, RestTableStore, VectorStore};

/// Default vector artifact path
pub const DEFAULT_VECTORS_FILE: &str = "title_vectors.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

/// Where the corpus lives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Vector artifact on local disk
    #[default]
    #[serde(alias = "json")]
    JsonFile,
    /// PostgREST table
    Rest,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" | "json_file" | "file" => Ok(StoreBackend::JsonFile),
            "rest" | "postgrest" | "supabase" => Ok(StoreBackend::Rest),
            other => Err(ConfigError::Invalid {
                key: "store.backend",
                message: format!("unknown store backend: {}", other),
            }),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
    pub ingest: IngestConfig,
    pub search: SearchConfig,
}

/// Embedding provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// API key; usually supplied through `GEMINI_API_KEY`
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Title attached to document embeddings
    pub document_title: Option<String>,
    /// Truncate embeddings to this many values
    pub output_dimensionality: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            document_title: Some(DEFAULT_DOCUMENT_TITLE.to_string()),
            output_dimensionality: None,
            timeout_secs: 30,
        }
    }
}

/// Vector store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Artifact path for the `json_file` backend
    pub vectors_file: PathBuf,
    pub rest: RestConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            vectors_file: PathBuf::from(DEFAULT_VECTORS_FILE),
            rest: RestConfig::default(),
        }
    }
}

/// PostgREST table settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestConfig {
    /// Project URL, e.g. `https://<project>.supabase.co`
    pub url: Option<String>,
    pub table: String,
    pub api_key: Option<String>,
    pub id_column: String,
    pub vector_column: String,
    pub page_size: usize,
    pub timeout_secs: u64,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            url: None,
            table: "title_embeddings".to_string(),
            api_key: None,
            id_column: DEFAULT_ID_COLUMN.to_string(),
            vector_column: DEFAULT_VECTOR_COLUMN.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: 30,
        }
    }
}

/// Ingestion settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub batch_size: usize,
    /// Rows embedded at once (1 = sequential)
    pub concurrency: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: 1,
        }
    }
}

/// Query settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub top_k: usize,
    /// Source table used to label results
    pub labels_file: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            labels_file: None,
        }
    }
}

impl CorpusConfig {
    /// Load from an optional TOML file, apply environment overrides, validate
    ///
    /// Recognised variables:
    /// - `GEMINI_API_KEY`, `CORPUS_EMBEDDING_MODEL`, `CORPUS_EMBEDDING_DIMENSIONS`
    /// - `CORPUS_STORE`: "json_file" or "rest"
    /// - `CORPUS_VECTORS_FILE`
    /// - `CORPUS_REST_URL`, `CORPUS_REST_TABLE`, `CORPUS_REST_KEY`
    /// - `CORPUS_BATCH_SIZE`, `CORPUS_CONCURRENCY`
    /// - `CORPUS_TOP_K`, `CORPUS_LABELS_FILE`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.with_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides from `lookup` (the process environment in production)
    ///
    /// Empty values are treated as unset.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("GEMINI_API_KEY") {
            self.embedding.api_key = Some(v);
        }
        if let Some(v) = get("CORPUS_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Some(v) = get("CORPUS_EMBEDDING_DIMENSIONS") {
            self.embedding.output_dimensionality =
                Some(parse_value("embedding.output_dimensionality", &v)?);
        }
        if let Some(v) = get("CORPUS_STORE") {
            self.store.backend = v.parse()?;
        }
        if let Some(v) = get("CORPUS_VECTORS_FILE") {
            self.store.vectors_file = PathBuf::from(v);
        }
        if let Some(v) = get("CORPUS_REST_URL") {
            self.store.rest.url = Some(v);
        }
        if let Some(v) = get("CORPUS_REST_TABLE") {
            self.store.rest.table = v;
        }
        if let Some(v) = get("CORPUS_REST_KEY") {
            self.store.rest.api_key = Some(v);
        }
        if let Some(v) = get("CORPUS_BATCH_SIZE") {
            self.ingest.batch_size = parse_value("ingest.batch_size", &v)?;
        }
        if let Some(v) = get("CORPUS_CONCURRENCY") {
            self.ingest.concurrency = parse_value("ingest.concurrency", &v)?;
        }
        if let Some(v) = get("CORPUS_TOP_K") {
            self.search.top_k = parse_value("search.top_k", &v)?;
        }
        if let Some(v) = get("CORPUS_LABELS_FILE") {
            self.search.labels_file = Some(PathBuf::from(v));
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("ingest.batch_size", self.ingest.batch_size)?;
        positive("ingest.concurrency", self.ingest.concurrency)?;
        positive("search.top_k", self.search.top_k)?;
        positive("store.rest.page_size", self.store.rest.page_size)?;
        positive("embedding.timeout_secs", self.embedding.timeout_secs as usize)?;
        positive("store.rest.timeout_secs", self.store.rest.timeout_secs as usize)?;
        if self.embedding.output_dimensionality == Some(0) {
            return Err(ConfigError::Invalid {
                key: "embedding.output_dimensionality",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl EmbeddingConfig {
    /// Build the Gemini client described by this configuration
    pub fn build_provider(&self) -> Result<Arc<dyn EmbeddingProvider>, ConfigError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ConfigError::Missing("embedding.api_key (GEMINI_API_KEY)"))?;

        let timeout = Duration::from_secs(self.timeout_secs);
        let embedder = GeminiEmbedder::new(api_key, &self.model, timeout)
            .map_err(|e| ConfigError::Invalid {
                key: "embedding",
                message: e.to_string(),
            })?
            .with_base_url(&self.base_url)
            .with_document_title(self.document_title.clone())
            .with_output_dimensionality(self.output_dimensionality);

        Ok(Arc::new(embedder))
    }

    /// Vector length ingestion should enforce, if fixed up front
    pub fn expected_dimension(&self) -> Option<usize> {
        self.output_dimensionality.map(|d| d as usize)
    }
}

impl StoreConfig {
    /// Build the vector store selected by `backend`
    pub fn build_store(&self) -> Result<Arc<dyn VectorStore>, ConfigError> {
        match self.backend {
            StoreBackend::JsonFile => Ok(Arc::new(JsonFileStore::new(&self.vectors_file))),
            StoreBackend::Rest => {
                let url = self
                    .rest
                    .url
                    .as_deref()
                    .ok_or(ConfigError::Missing("store.rest.url (CORPUS_REST_URL)"))?;

                let store = RestTableStore::new(
                    url,
                    &self.rest.table,
                    Duration::from_secs(self.rest.timeout_secs),
                )
                .map_err(|e| ConfigError::Invalid {
                    key: "store.rest",
                    message: e.to_string(),
                })?
                .with_api_key(self.rest.api_key.clone())
                .with_columns(&self.rest.id_column, &self.rest.vector_column)
                .with_page_size(self.rest.page_size);

                Ok(Arc::new(store))
            }
        }
    }
}

fn parse_value<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: format!("{:?}: {}", value, e),
    })
}

fn positive(key: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
