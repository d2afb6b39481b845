//! Search module - similarity ranking and the query pipeline
//!
//! This module provides:
//! - Brute-force cosine ranking over the full corpus
//! - The query pipeline: embed → read corpus → rank → top-k → join labels

pub mod query;
pub mod similarity;

pub use query::{QueryOutcome, QueryPipeline, DEFAULT_TOP_K};
pub use similarity::{cosine_similarity, rank, Ranking, ScoredItem};
