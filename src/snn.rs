//! Shared-Nearest-Neighbor Reference Sets
//!
//! The similarity of two points is the number of k-nearest neighbors they
//! have in common. The reference set of point `i` is the `ref_set` other
//! points most similar to it under that measure; it is more robust than the
//! plain k-NN set when densities vary.
//!
//! Ranking is by similarity descending, then by point index ascending, so
//! ties at the selection boundary always resolve to the lowest indices and
//! the output is deterministic regardless of thread scheduling.
//!
//! Every row is computed independently from read-only inputs, and rows are
//! built in parallel. For row `i` the neighbor set of `i` is loaded into a
//! fixed-size bitset over all `n` points; the overlap with each other row is
//! then `k` bit probes, giving O(n·k) work per row and O(n²·k) overall.

use rayon::prelude::*;
use std::time::Instant;
use tracing::debug;

use crate::error::{Result, SodError};
use crate::matrix::IndexMatrix;

/// Fixed-size membership set over point indices
#[derive(Debug, Clone)]
struct PointSet {
    words: Vec<u64>,
}

impl PointSet {
    fn with_capacity(n: usize) -> Self {
        Self {
            words: vec![0; n.div_ceil(64)],
        }
    }

    #[inline]
    fn insert(&mut self, i: usize) {
        self.words[i / 64] |= 1u64 << (i % 64);
    }

    #[inline]
    fn contains(&self, i: usize) -> bool {
        self.words[i / 64] & (1u64 << (i % 64)) != 0
    }

    fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Load exactly the members of `row`
    fn load(&mut self, row: &[usize]) {
        self.clear();
        for &m in row {
            self.insert(m);
        }
    }

    /// Number of entries of `row` that are members
    #[inline]
    fn overlap(&self, row: &[usize]) -> u32 {
        row.iter().filter(|&&m| self.contains(m)).count() as u32
    }
}

/// Per-row scratch space reused across the rows a worker handles
struct Scratch {
    members: PointSet,
    candidates: Vec<(u32, usize)>,
}

/// Shared-neighbor counts between point `i` and every point.
///
/// Entry `j` is the size of the intersection of the neighbor sets of `i`
/// and `j`. Entry `i` itself is the full row width.
///
/// # Panics
/// Panics if `i >= neighbors.n_rows()`.
pub fn shared_neighbor_counts(neighbors: &IndexMatrix, i: usize) -> Vec<u32> {
    let mut members = PointSet::with_capacity(neighbors.n_rows());
    members.load(neighbors.row(i));
    neighbors.rows().map(|row| members.overlap(row)).collect()
}

/// Build the reference-set matrix from a k-nearest-neighbor matrix.
///
/// Row `i` of the result lists the `ref_set` points `j != i` with the most
/// shared neighbors, most similar first.
///
/// # Errors
///
/// Returns [`SodError::InvalidConfig`] if `ref_set` is zero or not smaller
/// than the neighbor count. Since neighbor rows are distinct and exclude
/// the point itself, that also guarantees `ref_set < n`.
pub fn reference_sets(neighbors: &IndexMatrix, ref_set: usize) -> Result<IndexMatrix> {
    let n = neighbors.n_rows();
    let k = neighbors.width();

    if ref_set == 0 {
        return Err(SodError::InvalidConfig(
            "ref_set must be at least 1".to_string(),
        ));
    }
    if ref_set >= k {
        return Err(SodError::InvalidConfig(format!(
            "ref_set ({}) must be smaller than the number of neighbors ({})",
            ref_set, k
        )));
    }

    let start = Instant::now();
    let flat: Vec<usize> = (0..n)
        .into_par_iter()
        .map_init(
            || Scratch {
                members: PointSet::with_capacity(n),
                candidates: Vec::with_capacity(n),
            },
            |scratch, i| select_row(neighbors, i, ref_set, scratch),
        )
        .flatten_iter()
        .collect();

    debug!(
        n_samples = n,
        n_neighbors = k,
        ref_set = ref_set,
        elapsed_us = start.elapsed().as_micros() as u64,
        "SNN reference sets built"
    );

    Ok(IndexMatrix::from_flat(flat, n, ref_set))
}

/// Pick the `ref_set` most similar points for row `i`
fn select_row(neighbors: &IndexMatrix, i: usize, ref_set: usize, scratch: &mut Scratch) -> Vec<usize> {
    scratch.members.load(neighbors.row(i));
    scratch.candidates.clear();
    scratch.candidates.extend(
        neighbors
            .rows()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(j, row)| (scratch.members.overlap(row), j)),
    );

    // Most shared neighbors first, lowest index among equals
    let rank = |a: &(u32, usize), b: &(u32, usize)| b.0.cmp(&a.0).then(a.1.cmp(&b.1));

    let candidates = &mut scratch.candidates;
    if ref_set < candidates.len() {
        candidates.select_nth_unstable_by(ref_set - 1, rank);
        candidates.truncate(ref_set);
    }
    candidates.sort_unstable_by(rank);
    candidates.iter().map(|&(_, j)| j).collect()
}
