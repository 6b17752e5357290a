//! Subspace Scoring
//!
//! Scores every point by how far it lies from the mean of its reference set,
//! measured only along the axes on which that reference set is tightly
//! clustered. For a reference set `R` of `r` points in `d` dimensions:
//!
//! 1. `mean[j]` is the column mean of `R` and `var[j]` its population
//!    variance (divided by `r`).
//! 2. `var_total = Σ_j var[j]` is the total squared deviation of `R` from its
//!    mean, divided by `r`.
//! 3. Axis `j` is *relevant* when `var[j] < alpha · var_total / d`, i.e. the
//!    reference set varies less along it than `alpha` times the average axis.
//! 4. The score is the root-mean-square deviation of the point from `mean`
//!    over the relevant axes, or `0` when no axis is relevant.
//!
//! A reference set of identical points has zero variance everywhere; every
//! axis is then relevant and the score is the full-dimensional RMS distance
//! to that common point.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::{Result, SodError};
use crate::matrix::{FeatureMatrix, IndexMatrix};

/// Score of one point together with the subspace it was measured in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubspaceScore {
    /// Anomaly score (non-negative, higher = more anomalous)
    pub score: f64,
    /// Feature axes the reference set is concentrated along, ascending
    pub relevant_dims: Vec<usize>,
    /// Variance threshold an axis had to stay below to be relevant
    pub var_expect: f64,
    /// Column means of the reference set
    pub reference_mean: Vec<f64>,
}

impl SubspaceScore {
    /// Number of relevant dimensions
    pub fn rel_dim(&self) -> usize {
        self.relevant_dims.len()
    }

    /// True when no axis qualified and the score was defined as zero
    pub fn is_degenerate(&self) -> bool {
        self.relevant_dims.is_empty()
    }
}

/// Computes subspace outlier scores from reference sets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubspaceScorer {
    alpha: f64,
}

impl SubspaceScorer {
    /// Create a scorer with the given variance fraction.
    ///
    /// # Errors
    /// Returns [`SodError::InvalidConfig`] unless `0 < alpha < 1`.
    pub fn new(alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(SodError::InvalidConfig(format!(
                "alpha must be in (0, 1), got {}",
                alpha
            )));
        }
        Ok(Self { alpha })
    }

    /// Fraction of the average axis variance below which an axis is relevant
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Score every point of `data` against its row of `reference_sets`.
    pub fn score(&self, data: &FeatureMatrix, reference_sets: &IndexMatrix) -> Result<Vec<f64>> {
        Ok(self
            .score_with_subspaces(data, reference_sets)?
            .into_iter()
            .map(|s| s.score)
            .collect())
    }

    /// Score every point and keep the subspace each score was measured in.
    ///
    /// # Errors
    /// Returns [`SodError::InvalidIndex`] if `reference_sets` does not have
    /// one non-empty row per point of `data`.
    pub fn score_with_subspaces(
        &self,
        data: &FeatureMatrix,
        reference_sets: &IndexMatrix,
    ) -> Result<Vec<SubspaceScore>> {
        let n = data.n_samples();
        if reference_sets.n_rows() != n {
            return Err(SodError::InvalidIndex(format!(
                "reference sets cover {} points but the data has {}",
                reference_sets.n_rows(),
                n
            )));
        }
        if reference_sets.width() == 0 {
            return Err(SodError::InvalidIndex(
                "reference sets must not be empty".to_string(),
            ));
        }

        let start = Instant::now();
        let scores: Vec<SubspaceScore> = (0..n)
            .into_par_iter()
            .map(|i| self.score_point(data, i, reference_sets.row(i)))
            .collect();

        let degenerate = scores.iter().filter(|s| s.is_degenerate()).count();
        let mean_rel_dim =
            scores.iter().map(SubspaceScore::rel_dim).sum::<usize>() as f64 / n as f64;
        debug!(
            n_samples = n,
            n_features = data.n_features(),
            mean_rel_dim = mean_rel_dim,
            degenerate = degenerate,
            elapsed_us = start.elapsed().as_micros() as u64,
            "subspace scores computed"
        );
        if degenerate * 2 > n {
            warn!(
                degenerate = degenerate,
                n_samples = n,
                alpha = self.alpha,
                "most points have no relevant subspace and score 0; consider a larger alpha"
            );
        }

        Ok(scores)
    }

    /// Score point `i` of `data` against the given reference set.
    ///
    /// # Panics
    /// Panics if `reference` is empty or any index is out of range.
    pub fn score_point(&self, data: &FeatureMatrix, i: usize, reference: &[usize]) -> SubspaceScore {
        let d = data.n_features();
        let r = reference.len() as f64;

        // Accumulate relative to the first reference point so that a set of
        // identical points has a mean equal to that point bit for bit.
        let anchor = data.row(reference[0]);
        let mut mean = vec![0.0; d];
        for &m in reference {
            for ((acc, &x), &a) in mean.iter_mut().zip(data.row(m)).zip(anchor) {
                *acc += x - a;
            }
        }
        for (acc, &a) in mean.iter_mut().zip(anchor) {
            *acc = a + *acc / r;
        }

        let mut var = vec![0.0; d];
        for &m in reference {
            for ((acc, &x), &mu) in var.iter_mut().zip(data.row(m)).zip(&mean) {
                let dev = x - mu;
                *acc += dev * dev;
            }
        }
        for acc in var.iter_mut() {
            *acc /= r;
        }

        let var_total: f64 = var.iter().sum();
        let var_expect = self.alpha * var_total / d as f64;

        let relevant_dims: Vec<usize> = if var_total == 0.0 {
            (0..d).collect()
        } else {
            (0..d).filter(|&j| var[j] < var_expect).collect()
        };

        let score = if relevant_dims.is_empty() {
            0.0
        } else {
            let point = data.row(i);
            let sq: f64 = relevant_dims
                .iter()
                .map(|&j| {
                    let dev = point[j] - mean[j];
                    dev * dev
                })
                .sum();
            (sq / relevant_dims.len() as f64).sqrt()
        };

        SubspaceScore {
            score,
            relevant_dims,
            var_expect,
            reference_mean: mean,
        }
    }
}
