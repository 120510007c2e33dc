//! Exact inner-product search over L2-normalized vectors.

use serde::{Deserialize, Serialize};
use strata_llm::l2_normalize;
use strata_memory::ChunkId;

use crate::error::{IndexError, Result};

/// Dense row-major matrix of unit vectors plus the row → chunk mapping.
///
/// Rows are kept in the order given to [`FlatIndex::build`]; equal scores are
/// ranked by row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatIndex {
    dim: usize,
    ids: Vec<ChunkId>,
    matrix: Vec<f32>,
}

impl FlatIndex {
    /// Normalize and pack `vectors`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::EmptyCorpus`] for no input, and an error for any
    /// vector that is empty, non-finite, or of a different dimension than
    /// the first.
    pub fn build(vectors: Vec<(ChunkId, Vec<f32>)>) -> Result<Self> {
        let Some(dim) = vectors.first().map(|(_, v)| v.len()) else {
            return Err(IndexError::EmptyCorpus);
        };

        let mut ids = Vec::with_capacity(vectors.len());
        let mut matrix = Vec::with_capacity(vectors.len() * dim);

        for (id, mut vector) in vectors {
            validate(&id, &vector, dim)?;
            l2_normalize(&mut vector);
            matrix.extend_from_slice(&vector);
            ids.push(id);
        }

        Ok(Self { dim, ids, matrix })
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Top `k` rows by inner product with the normalized `query`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] if `query` has the wrong length.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(ChunkId, f32)>> {
        if query.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                chunk_id: "<query>".into(),
                expected: self.dim,
                actual: query.len(),
            });
        }
        if k == 0 || self.dim == 0 {
            return Ok(Vec::new());
        }

        let mut q = query.to_vec();
        l2_normalize(&mut q);

        let mut scored: Vec<(usize, f32)> = self
            .matrix
            .chunks_exact(self.dim)
            .map(|row| row.iter().zip(&q).map(|(a, b)| a * b).sum::<f32>())
            .enumerate()
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(row, score)| (self.ids[row].clone(), score))
            .collect())
    }
}

fn validate(id: &ChunkId, vector: &[f32], dim: usize) -> Result<()> {
    if vector.is_empty() {
        return Err(IndexError::MalformedVector {
            chunk_id: id.to_string(),
            reason: "empty".into(),
        });
    }
    if vector.len() != dim {
        return Err(IndexError::DimensionMismatch {
            chunk_id: id.to_string(),
            expected: dim,
            actual: vector.len(),
        });
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(IndexError::MalformedVector {
            chunk_id: id.to_string(),
            reason: "non-finite component".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ChunkId {
        ChunkId(s.into())
    }

    fn three() -> FlatIndex {
        FlatIndex::build(vec![
            (id("a"), vec![1.0, 0.0, 0.0]),
            (id("b"), vec![0.0, 2.0, 0.0]),
            (id("c"), vec![0.0, 0.0, 3.0]),
        ])
        .unwrap()
    }

    #[test]
    fn query_with_stored_vector_ranks_it_first() {
        let index = three();
        let hits = index.search(&[0.0, 5.0, 0.0], 3).unwrap();
        assert_eq!(hits[0].0, id("b"));
        assert!((hits[0].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn ties_rank_by_row() {
        let index = FlatIndex::build(vec![
            (id("x"), vec![1.0, 0.0]),
            (id("y"), vec![1.0, 0.0]),
        ])
        .unwrap();
        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].0, id("x"));
        assert_eq!(hits[1].0, id("y"));
    }

    #[test]
    fn k_limits_results() {
        assert_eq!(three().search(&[1.0, 1.0, 1.0], 2).unwrap().len(), 2);
        assert!(three().search(&[1.0, 1.0, 1.0], 0).unwrap().is_empty());
        assert_eq!(three().search(&[1.0, 1.0, 1.0], 10).unwrap().len(), 3);
    }

    #[test]
    fn empty_input_is_empty_corpus() {
        assert!(matches!(
            FlatIndex::build(Vec::new()),
            Err(IndexError::EmptyCorpus)
        ));
    }

    #[test]
    fn dimension_mismatch_aborts_build() {
        let err = FlatIndex::build(vec![(id("a"), vec![1.0, 0.0]), (id("b"), vec![1.0])])
            .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
    }

    #[test]
    fn non_finite_aborts_build() {
        let err = FlatIndex::build(vec![(id("a"), vec![f32::NAN, 0.0])]).unwrap_err();
        assert!(matches!(err, IndexError::MalformedVector { .. }));
    }

    #[test]
    fn empty_vector_aborts_build() {
        let err = FlatIndex::build(vec![(id("a"), Vec::new())]).unwrap_err();
        assert!(matches!(err, IndexError::MalformedVector { .. }));
    }

    #[test]
    fn wrong_query_dimension() {
        assert!(three().search(&[1.0], 1).is_err());
    }

    mod proptest_flat {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn scores_sorted_and_bounded(
                rows in proptest::collection::vec(
                    proptest::collection::vec(0.1f32..10.0, 4), 1..30),
                query in proptest::collection::vec(-10.0f32..10.0, 4),
            ) {
                let vectors: Vec<(ChunkId, Vec<f32>)> = rows
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (ChunkId(format!("{i:04}")), v))
                    .collect();
                let index = FlatIndex::build(vectors).unwrap();
                let hits = index.search(&query, 50).unwrap();
                for pair in hits.windows(2) {
                    prop_assert!(pair[0].1 >= pair[1].1);
                }
                for (_, s) in &hits {
                    prop_assert!(*s <= 1.0001 && *s >= -1.0001);
                }
            }
        }
    }
}
