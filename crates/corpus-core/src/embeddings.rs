//! Embedding provider abstraction and the Gemini `embedContent` client
//!
//! The pipelines only depend on [`EmbeddingProvider`]. Providers never retry:
//! a failed call is reported once and the caller decides what to do with it.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EmbeddingProviderError;

/// Default Gemini embedding model
pub const DEFAULT_MODEL: &str = "gemini-embedding-001";

/// Default Generative Language API root
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Title attached to document-mode requests
pub const DEFAULT_DOCUMENT_TITLE: &str = "Research Title Embedding";

/// What the embedding will be used for
///
/// Providers may embed documents and queries differently; the same text in
/// the same mode always yields a vector of the same dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingMode {
    /// Corpus items at ingestion time
    #[serde(rename = "RETRIEVAL_DOCUMENT")]
    Document,
    /// Free-text search input
    #[serde(rename = "RETRIEVAL_QUERY")]
    Query,
}

impl EmbeddingMode {
    /// Wire name of the task type
    pub fn task_type(self) -> &'static str {
        match self {
            EmbeddingMode::Document => "RETRIEVAL_DOCUMENT",
            EmbeddingMode::Query => "RETRIEVAL_QUERY",
        }
    }
}

/// Turns text into a fixed-length vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(
        &self,
        text: &str,
        mode: EmbeddingMode,
    ) -> Result<Vec<f32>, EmbeddingProviderError>;

    /// Model identifier, for logs
    fn name(&self) -> &str;
}

/// Client for the Generative Language `models/{model}:embedContent` endpoint
pub struct GeminiEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    document_title: Option<String>,
    output_dimensionality: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
    task_type: EmbeddingMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<u32>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GeminiEmbedder {
    /// Create a client for `model` authenticated with `api_key`
    ///
    /// `timeout` bounds every request so a stalled provider surfaces as
    /// [`EmbeddingProviderError::Timeout`] instead of hanging the run.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingProviderError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            api_key: api_key.into(),
            document_title: Some(DEFAULT_DOCUMENT_TITLE.to_string()),
            output_dimensionality: None,
        })
    }

    /// Point the client at a different API root (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Title sent with document-mode requests; `None` omits it
    pub fn with_document_title(mut self, title: Option<String>) -> Self {
        self.document_title = title;
        self
    }

    /// Ask the model to truncate its output to `dims` values
    pub fn with_output_dimensionality(mut self, dims: Option<u32>) -> Self {
        self.output_dimensionality = dims;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:embedContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn request_body<'a>(&'a self, text: &'a str, mode: EmbeddingMode) -> EmbedContentRequest<'a> {
        // the API only accepts a title for document embeddings
        let title = match mode {
            EmbeddingMode::Document => self.document_title.as_deref(),
            EmbeddingMode::Query => None,
        };

        EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: Content {
                parts: vec![Part { text }],
            },
            task_type: mode,
            title,
            output_dimensionality: self.output_dimensionality,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(
        &self,
        text: &str,
        mode: EmbeddingMode,
    ) -> Result<Vec<f32>, EmbeddingProviderError> {
        tracing::debug!(model = %self.model, task_type = mode.task_type(), "embedContent request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(text, mode))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingProviderError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        parse_embedding(&bytes)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

fn transport_error(err: reqwest::Error) -> EmbeddingProviderError {
    if err.is_timeout() {
        EmbeddingProviderError::Timeout
    } else {
        EmbeddingProviderError::Transport(err.to_string())
    }
}

/// Decode an `embedContent` response body
fn parse_embedding(body: &[u8]) -> Result<Vec<f32>, EmbeddingProviderError> {
    let response: EmbedContentResponse = serde_json::from_slice(body)
        .map_err(|e| EmbeddingProviderError::MalformedResponse(e.to_string()))?;

    if response.embedding.values.is_empty() {
        return Err(EmbeddingProviderError::EmptyEmbedding);
    }
    Ok(response.embedding.values)
}

/// Pull the human-readable message out of a Google API error body
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn embedder() -> GeminiEmbedder {
        GeminiEmbedder::new("test-key", DEFAULT_MODEL, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_mode_wire_names() {
        assert_eq!(
            serde_json::to_value(EmbeddingMode::Document).unwrap(),
            json!("RETRIEVAL_DOCUMENT")
        );
        assert_eq!(EmbeddingMode::Query.task_type(), "RETRIEVAL_QUERY");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let e = embedder().with_base_url("http://localhost:8080/v1beta/");
        assert_eq!(
            e.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-embedding-001:embedContent"
        );
    }

    #[test]
    fn test_document_request_carries_title() {
        let e = embedder();
        let body = serde_json::to_value(e.request_body("Deep sea microbes", EmbeddingMode::Document))
            .unwrap();

        assert_eq!(
            body,
            json!({
                "model": "models/gemini-embedding-001",
                "content": { "parts": [{ "text": "Deep sea microbes" }] },
                "taskType": "RETRIEVAL_DOCUMENT",
                "title": "Research Title Embedding",
            })
        );
    }

    #[test]
    fn test_query_request_omits_title() {
        let e = embedder().with_output_dimensionality(Some(768));
        let body = serde_json::to_value(e.request_body("microbes", EmbeddingMode::Query)).unwrap();

        assert_eq!(body["taskType"], json!("RETRIEVAL_QUERY"));
        assert_eq!(body["outputDimensionality"], json!(768));
        assert!(body.get("title").is_none());
    }

    #[test]
    fn test_parse_embedding() {
        let body = br#"{"embedding":{"values":[0.25,-0.5,1.0]}}"#;
        assert_eq!(parse_embedding(body).unwrap(), vec![0.25, -0.5, 1.0]);
    }

    #[test]
    fn test_parse_empty_embedding() {
        let body = br#"{"embedding":{"values":[]}}"#;
        assert_eq!(
            parse_embedding(body),
            Err(EmbeddingProviderError::EmptyEmbedding)
        );
    }

    #[test]
    fn test_parse_malformed_body() {
        assert!(matches!(
            parse_embedding(b"<html>bad gateway</html>"),
            Err(EmbeddingProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(api_error_message(body), "Quota exceeded");
        assert_eq!(api_error_message("  upstream down \n"), "upstream down");
    }
}
