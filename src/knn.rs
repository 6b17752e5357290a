//! k-Nearest-Neighbor Search
//!
//! The detector only needs, for every point, the indices of its `k` nearest
//! neighbors with the point itself excluded. [`NeighborSearch`] is that
//! contract; [`BruteForceKnn`] is the exact implementation used by default
//! and [`PrecomputedNeighbors`] replays neighbor lists computed elsewhere.
//!
//! # Example
//!
//! ```
//! use needle_sod::{BruteForceKnn, FeatureMatrix, NeighborSearch};
//!
//! let data = FeatureMatrix::from_rows(&[[0.0], [1.0], [3.0], [7.0]]).unwrap();
//! let knn = BruteForceKnn::default().kneighbors(&data, 2).unwrap();
//! assert_eq!(knn.row(0), &[1, 2]);
//! assert_eq!(knn.row(3), &[2, 1]);
//! ```

use ordered_float::OrderedFloat;
use rayon::prelude::*;
use std::collections::BinaryHeap;
use std::time::Instant;
use tracing::debug;

use crate::distance::DistanceFunction;
use crate::error::{Result, SodError};
use crate::matrix::{FeatureMatrix, IndexMatrix};

/// Source of k-nearest-neighbor index lists.
///
/// Implementations return an `n × k` [`IndexMatrix`] whose row `i` holds the
/// `k` nearest neighbors of point `i`, excluding `i` itself. Only the set of
/// neighbors matters to the detector; order within a row is not relied on.
pub trait NeighborSearch: Send + Sync {
    /// Find the `k` nearest neighbors of every row of `data`
    fn kneighbors(&self, data: &FeatureMatrix, k: usize) -> Result<IndexMatrix>;
}

/// Check that `k` neighbors other than the point itself exist
fn check_k(n_samples: usize, k: usize) -> Result<()> {
    if k == 0 {
        return Err(SodError::InvalidConfig(
            "number of neighbors must be at least 1".to_string(),
        ));
    }
    if k >= n_samples {
        return Err(SodError::InsufficientSamples {
            n_samples,
            n_neighbors: k,
        });
    }
    Ok(())
}

/// Exact k-NN search by scanning every pair of points.
///
/// Each query point keeps a bounded max-heap of its `k` best candidates, so
/// a query costs O(n log k) distance evaluations; queries run in parallel.
/// Neighbors come back nearest first, and equal distances are ordered by
/// ascending index, which makes the result fully deterministic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BruteForceKnn {
    distance: DistanceFunction,
}

impl BruteForceKnn {
    /// Create a search using the given distance function
    pub fn new(distance: DistanceFunction) -> Self {
        Self { distance }
    }

    /// Distance function used to rank neighbors
    pub fn distance(&self) -> DistanceFunction {
        self.distance
    }

    fn nearest(&self, data: &FeatureMatrix, i: usize, k: usize) -> Vec<usize> {
        let query = data.row(i);
        // Max-heap on (distance, index): the top is the current worst
        // candidate, so ties at the boundary evict the larger index.
        let mut heap: BinaryHeap<(OrderedFloat<f64>, usize)> = BinaryHeap::with_capacity(k + 1);

        for (j, candidate) in data.rows().enumerate() {
            if j == i {
                continue;
            }
            heap.push((OrderedFloat(self.distance.compute(query, candidate)), j));
            if heap.len() > k {
                heap.pop();
            }
        }

        heap.into_sorted_vec().into_iter().map(|(_, j)| j).collect()
    }
}

impl NeighborSearch for BruteForceKnn {
    fn kneighbors(&self, data: &FeatureMatrix, k: usize) -> Result<IndexMatrix> {
        let n = data.n_samples();
        check_k(n, k)?;

        let start = Instant::now();
        let flat: Vec<usize> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| self.nearest(data, i, k))
            .collect();

        debug!(
            n_samples = n,
            k = k,
            distance = %self.distance,
            elapsed_us = start.elapsed().as_micros() as u64,
            "brute-force kNN search complete"
        );

        Ok(IndexMatrix::from_flat(flat, n, k))
    }
}

/// Neighbor lists computed ahead of time, e.g. by an external index.
///
/// Rows must be ordered nearest first: asking for `k` neighbors returns the
/// first `k` entries of each stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecomputedNeighbors {
    neighbors: IndexMatrix,
}

impl PrecomputedNeighbors {
    /// Wrap an already validated neighbor matrix
    pub fn new(neighbors: IndexMatrix) -> Self {
        Self { neighbors }
    }

    /// The stored neighbor matrix
    pub fn neighbors(&self) -> &IndexMatrix {
        &self.neighbors
    }
}

impl NeighborSearch for PrecomputedNeighbors {
    fn kneighbors(&self, data: &FeatureMatrix, k: usize) -> Result<IndexMatrix> {
        let n = data.n_samples();
        if self.neighbors.n_rows() != n {
            return Err(SodError::InvalidIndex(format!(
                "precomputed neighbors cover {} points but the data has {}",
                self.neighbors.n_rows(),
                n
            )));
        }
        check_k(n, k)?;
        if self.neighbors.width() < k {
            return Err(SodError::InvalidIndex(format!(
                "precomputed neighbors hold {} per point, {} requested",
                self.neighbors.width(),
                k
            )));
        }

        let flat = self
            .neighbors
            .rows()
            .flat_map(|row| row[..k].iter().copied())
            .collect();
        Ok(IndexMatrix::from_flat(flat, n, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: &[f64]) -> FeatureMatrix {
        let rows: Vec<Vec<f64>> = points.iter().map(|&x| vec![x]).collect();
        FeatureMatrix::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_nearest_first_and_self_excluded() {
        let data = line(&[0.0, 1.0, 3.0, 7.0, 15.0]);
        let knn = BruteForceKnn::default().kneighbors(&data, 3).unwrap();

        assert_eq!(knn.n_rows(), 5);
        assert_eq!(knn.width(), 3);
        assert_eq!(knn.row(0), &[1, 2, 3]);
        assert_eq!(knn.row(2), &[1, 0, 3]);
        assert_eq!(knn.row(4), &[3, 2, 1]);
        for (i, row) in knn.rows().enumerate() {
            assert!(!row.contains(&i));
        }
    }

    #[test]
    fn test_ties_break_by_ascending_index() {
        // Points 1 and 3 are both at distance 1 from point 2; same for 0 and 4
        let data = line(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let knn = BruteForceKnn::default().kneighbors(&data, 3).unwrap();
        assert_eq!(knn.row(2), &[1, 3, 0]);

        // Identical points: everything ties, lowest indices win
        let same = line(&[5.0; 6]);
        let knn = BruteForceKnn::default().kneighbors(&same, 2).unwrap();
        assert_eq!(knn.row(0), &[1, 2]);
        assert_eq!(knn.row(3), &[0, 1]);
    }

    #[test]
    fn test_alternative_metric() {
        let data = FeatureMatrix::from_rows(&[[0.0, 0.0], [3.0, 0.0], [2.0, 2.0]]).unwrap();
        // L1: |(3,0)| = 3 < |(2,2)| = 4; L-inf: 3 > 2
        let l1 = BruteForceKnn::new(DistanceFunction::Manhattan).kneighbors(&data, 1).unwrap();
        let linf = BruteForceKnn::new(DistanceFunction::Chebyshev).kneighbors(&data, 1).unwrap();
        assert_eq!(l1.row(0), &[1]);
        assert_eq!(linf.row(0), &[2]);
    }

    #[test]
    fn test_rejects_k_out_of_range() {
        let data = line(&[0.0, 1.0, 2.0]);
        assert!(matches!(
            BruteForceKnn::default().kneighbors(&data, 3),
            Err(SodError::InsufficientSamples { n_samples: 3, n_neighbors: 3 })
        ));
        assert!(matches!(
            BruteForceKnn::default().kneighbors(&data, 0),
            Err(SodError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_precomputed_truncates_rows() {
        let data = line(&[0.0, 1.0, 2.0, 3.0]);
        let stored = IndexMatrix::from_rows(vec![
            vec![1, 2, 3],
            vec![0, 2, 3],
            vec![1, 3, 0],
            vec![2, 1, 0],
        ])
        .unwrap();
        let search = PrecomputedNeighbors::new(stored);

        let knn = search.kneighbors(&data, 2).unwrap();
        assert_eq!(knn.row(2), &[1, 3]);
        assert!(matches!(search.kneighbors(&data, 4), Err(SodError::InsufficientSamples { .. })));

        let fewer = line(&[0.0, 1.0]);
        assert!(matches!(search.kneighbors(&fewer, 1), Err(SodError::InvalidIndex(_))));
    }

    #[test]
    fn test_matches_brute_force_when_replayed() {
        let data = line(&[0.0, 0.5, 2.0, 2.1, 9.0, 9.3]);
        let exact = BruteForceKnn::default().kneighbors(&data, 3).unwrap();
        let replay = PrecomputedNeighbors::new(exact.clone()).kneighbors(&data, 3).unwrap();
        assert_eq!(exact, replay);
    }
}
