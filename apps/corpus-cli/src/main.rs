//! Corpus CLI - semantic search over embedded research titles
//!
//! Subcommands:
//! - `ingest`: embed a source table and store the vectors
//! - `load`: copy a vector artifact into the configured store
//! - `search`: rank the stored corpus against a free-text query

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use corpus_core::CorpusConfig;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod error;
mod output;
mod state;

use commands::SearchRequest;
use error::CliError;
use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "corpus")]
#[command(version, about = "Embedding-based semantic search over a title corpus")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "CORPUS_CONFIG")]
    config: Option<PathBuf>,

    /// Vector store backend: json_file or rest
    #[arg(long, global = true)]
    store: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Embed every row of a source table and store the vectors
    Ingest {
        /// CSV file with `id` and `title` columns
        #[arg(short, long, default_value = "title.csv")]
        input: PathBuf,

        /// Records per store write
        #[arg(long)]
        batch_size: Option<usize>,

        /// Rows embedded at once
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Copy a vector artifact into the configured store
    Load {
        /// JSON array of `{id, vector}` records
        #[arg(long, default_value = "title_vectors.json")]
        from: PathBuf,

        /// Records per store write
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Find the stored items most similar to a query
    Search {
        /// Query text; prompted for on stdin when omitted
        query: Option<String>,

        /// Number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// CSV file used to label results
        #[arg(long)]
        labels: Option<PathBuf>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // stdout carries results, so logs go to stderr
    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::from(1);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code())
        }
    }
}

fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("corpus_core={level},corpus={level}"))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = CorpusConfig::load(cli.config.as_deref())?;
    if let Some(backend) = &cli.store {
        config.store.backend = backend.parse()?;
    }

    match cli.command {
        Command::Ingest {
            input,
            batch_size,
            concurrency,
        } => {
            if let Some(batch_size) = batch_size {
                config.ingest.batch_size = batch_size;
            }
            if let Some(concurrency) = concurrency {
                config.ingest.concurrency = concurrency;
            }
            let state = AppState::new(config)?;
            commands::ingest(&state, &input).await
        }
        Command::Load { from, batch_size } => {
            if let Some(batch_size) = batch_size {
                config.ingest.batch_size = batch_size;
            }
            let state = AppState::new(config)?;
            commands::load(&state, &from).await
        }
        Command::Search {
            query,
            top_k,
            labels,
            json,
        } => {
            let state = AppState::new(config)?;
            let request = SearchRequest {
                query,
                top_k,
                labels,
                json,
            };
            commands::search(&state, request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_arguments() {
        let cli = Cli::try_parse_from([
            "corpus",
            "--store",
            "rest",
            "search",
            "bone loss",
            "-k",
            "3",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.store.as_deref(), Some("rest"));
        match cli.command {
            Command::Search {
                query, top_k, json, ..
            } => {
                assert_eq!(query.as_deref(), Some("bone loss"));
                assert_eq!(top_k, Some(3));
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_search_query_is_optional() {
        let cli = Cli::try_parse_from(["corpus", "-vv", "search"]).unwrap();

        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Search { query: None, .. }));
    }

    #[test]
    fn test_ingest_defaults() {
        let cli = Cli::try_parse_from(["corpus", "ingest"]).unwrap();

        match cli.command {
            Command::Ingest {
                input, batch_size, ..
            } => {
                assert_eq!(input, PathBuf::from("title.csv"));
                assert_eq!(batch_size, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
