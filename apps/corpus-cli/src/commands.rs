//! Subcommand implementations
//!
//! Results and summaries go to stdout, progress goes to the tracing
//! subscriber on stderr.

use std::path::{Path, PathBuf};

use anyhow::Context;
use corpus_core::storage::JsonFileStore;
use corpus_core::{
    read_source_table, BulkLoader, IngestionPipeline, LabelMap, QueryPipeline, StoreBackend,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::error::CliError;
use crate::output;
use crate::state::AppState;

const QUERY_PROMPT: &str = "Enter your search query: ";

/// Embed every row of `input` and append the vectors to the store
pub async fn ingest(state: &AppState, input: &Path) -> Result<(), CliError> {
    let rows = read_source_table(input)?;
    info!(rows = rows.len(), input = %input.display(), "Read source table");

    let provider = state.provider()?;
    let summary = IngestionPipeline::new(provider.as_ref(), state.store.as_ref())
        .with_batch_size(state.config.ingest.batch_size)
        .with_concurrency(state.config.ingest.concurrency)
        .with_dimension(state.config.embedding.expected_dimension())
        .run(&rows)
        .await;

    emit(&output::format_ingest_summary(&summary)?).await?;

    if summary.is_clean() {
        Ok(())
    } else {
        Err(CliError::Incomplete(format!(
            "{} row(s) failed, {} batch(es) failed",
            summary.rows_failed(),
            summary.batches.batches_failed()
        )))
    }
}

/// Copy a vector artifact into the configured store
pub async fn load(state: &AppState, from: &Path) -> Result<(), CliError> {
    // a missing artifact would otherwise read as an empty corpus
    if !from.is_file() {
        return Err(CliError::Usage(format!(
            "vector artifact not found: {}",
            from.display()
        )));
    }

    if state.config.store.backend == StoreBackend::JsonFile
        && same_file(from, &state.config.store.vectors_file)
    {
        return Err(CliError::Usage(format!(
            "{} is the configured store and cannot be loaded into itself",
            from.display()
        )));
    }

    let source = JsonFileStore::new(from);
    let summary = BulkLoader::new(state.config.ingest.batch_size)
        .load(&source, state.store.as_ref())
        .await?;

    emit(&output::format_load_summary(&summary)?).await?;

    if summary.is_clean() {
        Ok(())
    } else {
        Err(CliError::Incomplete(format!(
            "{} batch(es) failed",
            summary.batches.batches_failed()
        )))
    }
}

pub struct SearchRequest {
    pub query: Option<String>,
    pub top_k: Option<usize>,
    pub labels: Option<PathBuf>,
    pub json: bool,
}

/// Rank the corpus against a query and print the best matches
pub async fn search(state: &AppState, request: SearchRequest) -> Result<(), CliError> {
    let query = match request.query {
        Some(query) => query,
        None => prompt_query().await?,
    };
    let query = query.trim();
    if query.is_empty() {
        return Err(CliError::Usage("query must not be empty".to_string()));
    }

    let top_k = request.top_k.unwrap_or(state.config.search.top_k);
    let labels_file = request
        .labels
        .or_else(|| state.config.search.labels_file.clone());
    let labels = load_labels(labels_file)?;

    let provider = state.provider()?;
    let outcome = QueryPipeline::new(provider.as_ref(), state.store.as_ref(), &labels)
        .search(query, top_k)
        .await?;

    if !outcome.skipped.is_empty() {
        warn!(skipped = outcome.skipped.len(), "Some corpus items could not be scored");
    }

    let text = if request.json {
        output::format_results_json(&outcome.results)?
    } else {
        output::format_results(&outcome.results)?
    };
    emit(&text).await?;

    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn load_labels(path: Option<PathBuf>) -> Result<LabelMap, CliError> {
    let Some(path) = path else {
        warn!("No labels file configured, results will use the placeholder title");
        return Ok(LabelMap::default());
    };

    let labels = LabelMap::from_rows(read_source_table(&path)?);
    info!(labels = labels.len(), path = %path.display(), "Loaded labels");
    Ok(labels)
}

async fn prompt_query() -> anyhow::Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(QUERY_PROMPT.as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read query from stdin")?;
    Ok(line)
}

async fn emit(text: &str) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(text.as_bytes())
        .await
        .context("Failed to write to stdout")?;
    stdout.flush().await?;
    Ok(())
}
