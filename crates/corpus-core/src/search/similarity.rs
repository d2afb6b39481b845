//! Brute-force cosine similarity ranking
//!
//! Every query is scored against the whole corpus in a single linear pass
//! (O(N·D) for N items of dimension D). There is no index.
//!
//! # Ordering
//!
//! Results are sorted by score descending. Equal scores are ordered by
//! ascending id so repeated calls over the same input always agree.
//!
//! # Degenerate vectors
//!
//! Cosine similarity is undefined for a zero vector. A corpus item with zero
//! (or non-finite) norm is skipped, logged, and reported in
//! [`Ranking::degenerate`]; the rest of the corpus is still ranked. A
//! degenerate *query* fails the whole pass, since nothing can be scored.

use serde::Serialize;
use tracing::warn;

use crate::error::{DegenerateVectorError, RankError};
use crate::item::VectorRecord;

/// An item id with its similarity to the query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredItem {
    pub id: i64,
    pub score: f32,
}

/// Output of a ranking pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    /// Scored items, best first
    pub results: Vec<ScoredItem>,
    /// Items excluded because their vector has no direction
    pub degenerate: Vec<DegenerateVectorError>,
}

/// Cosine similarity of two equal-length vectors
///
/// Returns `None` when either vector has zero or non-finite norm. Callers
/// must check lengths first; [`rank`] does.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    let norm_a = norm(a)?;
    let norm_b = norm(b)?;
    Some(score(a, b, norm_a, norm_b))
}

/// Rank `corpus` against `query`, best match first
///
/// # Errors
///
/// - [`RankError::DimensionMismatch`] if any corpus vector's length differs
///   from the query's
/// - [`RankError::DegenerateQuery`] if the query has zero norm and the corpus
///   is not empty
pub fn rank(query: &[f32], corpus: &[VectorRecord]) -> Result<Ranking, RankError> {
    if corpus.is_empty() {
        return Ok(Ranking::default());
    }

    let query_norm = norm(query).ok_or(RankError::DegenerateQuery)?;
    let mut ranking = Ranking {
        results: Vec::with_capacity(corpus.len()),
        degenerate: Vec::new(),
    };

    for record in corpus {
        if record.vector.len() != query.len() {
            return Err(RankError::DimensionMismatch {
                id: record.id,
                expected: query.len(),
                actual: record.vector.len(),
            });
        }

        match norm(&record.vector) {
            Some(item_norm) => ranking.results.push(ScoredItem {
                id: record.id,
                score: score(query, &record.vector, query_norm, item_norm),
            }),
            None => {
                warn!(id = record.id, "Skipping item with zero-norm vector");
                ranking.degenerate.push(DegenerateVectorError { id: record.id });
            }
        }
    }

    ranking
        .results
        .sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));

    Ok(ranking)
}

fn norm(v: &[f32]) -> Option<f64> {
    let n = v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt();
    (n > 0.0 && n.is_finite()).then_some(n)
}

fn score(a: &[f32], b: &[f32], norm_a: f64, norm_b: f64) -> f32 {
    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum();
    // rounding can push |cos| a hair past 1
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn rec(id: i64, v: &[f32]) -> VectorRecord {
        VectorRecord::new(id, v.to_vec())
    }

    #[test]
    fn test_empty_corpus_is_not_an_error() {
        let ranking = rank(&[1.0, 0.0], &[]).unwrap();
        assert!(ranking.results.is_empty());
        assert!(ranking.degenerate.is_empty());
    }

    #[test]
    fn test_empty_corpus_with_zero_query() {
        assert!(rank(&[0.0, 0.0], &[]).unwrap().results.is_empty());
    }

    #[test]
    fn test_zero_vector_item_is_skipped() {
        let corpus = vec![rec(1, &[0.0, 0.0]), rec(2, &[1.0, 0.0])];
        let ranking = rank(&[1.0, 0.0], &corpus).unwrap();

        assert_eq!(ranking.results, vec![ScoredItem { id: 2, score: 1.0 }]);
        assert_eq!(ranking.degenerate, vec![DegenerateVectorError { id: 1 }]);
    }

    #[test]
    fn test_non_finite_item_is_skipped() {
        let corpus = vec![rec(1, &[f32::NAN, 1.0]), rec(2, &[0.0, 1.0])];
        let ranking = rank(&[0.0, 1.0], &corpus).unwrap();

        assert_eq!(ranking.results.len(), 1);
        assert_eq!(ranking.results[0].id, 2);
        assert_eq!(ranking.degenerate, vec![DegenerateVectorError { id: 1 }]);
    }

    #[test]
    fn test_degenerate_query_fails() {
        let corpus = vec![rec(1, &[1.0, 0.0])];
        assert_eq!(rank(&[0.0, 0.0], &corpus), Err(RankError::DegenerateQuery));
    }

    #[test]
    fn test_dimension_mismatch_fails_whole_ranking() {
        let corpus = vec![rec(1, &[1.0, 0.0]), rec(2, &[1.0, 0.0, 0.0])];
        assert_eq!(
            rank(&[1.0, 0.0], &corpus),
            Err(RankError::DimensionMismatch {
                id: 2,
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn test_orders_by_score_descending() {
        let corpus = vec![
            rec(1, &[0.0, 1.0]),
            rec(2, &[1.0, 0.0]),
            rec(3, &[1.0, 1.0]),
            rec(4, &[-1.0, 0.0]),
        ];
        let ranking = rank(&[1.0, 0.0], &corpus).unwrap();
        let ids: Vec<i64> = ranking.results.iter().map(|r| r.id).collect();

        assert_eq!(ids, vec![2, 3, 1, 4]);
        assert_eq!(ranking.results[3].score, -1.0);
    }

    #[test]
    fn test_ties_break_by_ascending_id() {
        let corpus = vec![
            rec(9, &[2.0, 0.0]),
            rec(3, &[1.0, 0.0]),
            rec(5, &[0.5, 0.0]),
        ];
        let first = rank(&[1.0, 0.0], &corpus).unwrap();
        let ids: Vec<i64> = first.results.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 5, 9]);

        let second = rank(&[1.0, 0.0], &corpus).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cosine_rejects_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]), None);
    }

    #[test]
    fn test_cosine_is_magnitude_independent() {
        let a = cosine_similarity(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((a - 1.0).abs() < 1e-6);
    }

    fn nonzero_vector(len: usize) -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(-1000.0f32..1000.0, len)
            .prop_filter("needs a direction", |v| v.iter().any(|x| x.abs() > 1e-3))
    }

    fn vector_pair() -> impl Strategy<Value = (Vec<f32>, Vec<f32>)> {
        (1usize..48).prop_flat_map(|len| (nonzero_vector(len), nonzero_vector(len)))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn cosine_is_symmetric((a, b) in vector_pair()) {
            prop_assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
        }

        #[test]
        fn cosine_with_self_is_one(a in (1usize..48).prop_flat_map(nonzero_vector)) {
            let sim = cosine_similarity(&a, &a).unwrap();
            prop_assert!((sim - 1.0).abs() < 1e-5, "sim = {}", sim);
        }

        #[test]
        fn cosine_stays_in_range((a, b) in vector_pair()) {
            let sim = cosine_similarity(&a, &b).unwrap();
            prop_assert!((-1.0..=1.0).contains(&sim));
        }

        #[test]
        fn ranking_is_sorted_and_deterministic(
            (query, corpus) in (1usize..8).prop_flat_map(|len| (
                nonzero_vector(len),
                prop::collection::vec(nonzero_vector(len), 0..20),
            ))
        ) {
            let corpus: Vec<VectorRecord> = corpus
                .into_iter()
                .enumerate()
                .map(|(i, v)| VectorRecord::new(i as i64, v))
                .collect();

            let first = rank(&query, &corpus).unwrap();
            prop_assert_eq!(first.results.len(), corpus.len());
            for pair in first.results.windows(2) {
                prop_assert!(
                    pair[0].score > pair[1].score
                        || (pair[0].score == pair[1].score && pair[0].id < pair[1].id)
                );
            }
            prop_assert_eq!(first, rank(&query, &corpus).unwrap());
        }
    }
}
