//! Subspace Outlier Detection
//!
//! [`Sod`] ties the pipeline together:
//!
//! 1. k-nearest-neighbor search over the feature matrix ([`NeighborSearch`])
//! 2. shared-nearest-neighbor reference sets ([`crate::snn`])
//! 3. per-point subspace scoring ([`SubspaceScorer`])
//! 4. on fit, a contamination threshold that turns scores into labels
//!
//! Scoring is transductive: neighbors of every point are looked up inside
//! the matrix being scored, so `score`, `predict` and `predict_proba` rerun
//! the whole pipeline on their input. Only the threshold and the training
//! score statistics carry over from `fit`.
//!
//! # Example
//!
//! ```
//! use needle_sod::{FeatureMatrix, Sod, SodConfig};
//!
//! // A line of points along x, plus one point far off the line
//! let mut rows: Vec<Vec<f64>> = (0..12)
//!     .map(|i| vec![i as f64, 0.01 * (i % 2) as f64])
//!     .collect();
//! rows.push(vec![5.5, 4.0]);
//! let x = FeatureMatrix::from_rows(&rows).unwrap();
//!
//! let config = SodConfig::default().with_n_neighbors(6).with_ref_set(4);
//! let mut sod = Sod::new(config).unwrap();
//! sod.fit(&x).unwrap();
//!
//! assert!(sod.find_outliers().unwrap().contains(&12));
//! ```

use std::time::Instant;
use tracing::{info, instrument};

use crate::config::SodConfig;
use crate::error::{Result, SodError};
use crate::knn::{BruteForceKnn, NeighborSearch};
use crate::matrix::{FeatureMatrix, IndexMatrix};
use crate::snn;
use crate::subspace::{SubspaceScore, SubspaceScorer};
use crate::threshold::{binarize, contamination_threshold, ProbabilityMethod, ScoreStats};

/// State produced by a successful fit
#[derive(Debug, Clone)]
struct Fitted {
    decision_scores: Vec<f64>,
    threshold: f64,
    labels: Vec<u8>,
    stats: ScoreStats,
}

/// Subspace outlier detector.
///
/// Generic over the k-NN backend; the default is exact brute-force search
/// using the configured distance function.
#[derive(Debug, Clone)]
pub struct Sod<S = BruteForceKnn> {
    config: SodConfig,
    search: S,
    scorer: SubspaceScorer,
    fitted: Option<Fitted>,
}

impl Sod<BruteForceKnn> {
    /// Create a detector with the built-in neighbor search.
    ///
    /// # Errors
    /// Returns [`SodError::InvalidConfig`] if the configuration is out of
    /// range, before any data is seen.
    pub fn new(config: SodConfig) -> Result<Self> {
        let search = BruteForceKnn::new(config.distance);
        Self::with_neighbor_search(config, search)
    }
}

impl<S: NeighborSearch> Sod<S> {
    /// Create a detector that takes its k-NN lists from `search`.
    ///
    /// The `distance` field of the configuration only affects the built-in
    /// search and is ignored here.
    pub fn with_neighbor_search(config: SodConfig, search: S) -> Result<Self> {
        config.validate()?;
        let scorer = SubspaceScorer::new(config.alpha)?;
        Ok(Self {
            config,
            search,
            scorer,
            fitted: None,
        })
    }

    /// The validated configuration
    pub fn config(&self) -> &SodConfig {
        &self.config
    }

    /// The k-NN backend
    pub fn neighbor_search(&self) -> &S {
        &self.search
    }

    /// Whether `fit` has completed successfully
    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Shared-nearest-neighbor reference sets of every point of `x`.
    ///
    /// # Errors
    /// [`SodError::InsufficientSamples`] unless `x` has more rows than
    /// `n_neighbors`; [`SodError::InvalidIndex`] if the neighbor search
    /// returns a matrix of the wrong shape.
    pub fn reference_sets(&self, x: &FeatureMatrix) -> Result<IndexMatrix> {
        let n = x.n_samples();
        let k = self.config.n_neighbors;
        if n <= k {
            return Err(SodError::InsufficientSamples {
                n_samples: n,
                n_neighbors: k,
            });
        }

        let neighbors = self.search.kneighbors(x, k)?;
        if neighbors.n_rows() != n || neighbors.width() != k {
            return Err(SodError::InvalidIndex(format!(
                "neighbor search returned a {}x{} matrix, expected {}x{}",
                neighbors.n_rows(),
                neighbors.width(),
                n,
                k
            )));
        }

        snn::reference_sets(&neighbors, self.config.ref_set)
    }

    /// Outlier score of every point of `x`, without touching fitted state
    #[instrument(skip_all, fields(n_samples = x.n_samples(), n_features = x.n_features()))]
    pub fn score(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        let refs = self.reference_sets(x)?;
        self.scorer.score(x, &refs)
    }

    /// Scores of `x` together with the subspace each was measured in
    pub fn explain(&self, x: &FeatureMatrix) -> Result<Vec<SubspaceScore>> {
        let refs = self.reference_sets(x)?;
        self.scorer.score_with_subspaces(x, &refs)
    }

    /// Score the training data and derive the label threshold from the
    /// configured contamination.
    ///
    /// A failed fit leaves any previous fitted state in place.
    #[instrument(skip_all, fields(n_samples = x.n_samples(), n_features = x.n_features()))]
    pub fn fit(&mut self, x: &FeatureMatrix) -> Result<&mut Self> {
        let start = Instant::now();

        let decision_scores = self.score(x)?;
        let threshold = contamination_threshold(&decision_scores, self.config.contamination)?;
        let labels = binarize(&decision_scores, threshold);
        let stats = ScoreStats::from_scores(&decision_scores)?;

        let outliers = labels.iter().filter(|&&l| l == 1).count();
        info!(
            n_samples = x.n_samples(),
            n_features = x.n_features(),
            threshold = threshold,
            outliers = outliers,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "SOD fit complete"
        );

        self.fitted = Some(Fitted {
            decision_scores,
            threshold,
            labels,
            stats,
        });
        Ok(self)
    }

    fn fitted(&self) -> Result<&Fitted> {
        self.fitted.as_ref().ok_or(SodError::NotFitted)
    }

    /// Scores of the training data
    pub fn decision_scores(&self) -> Result<&[f64]> {
        Ok(&self.fitted()?.decision_scores)
    }

    /// Score at or above which a point is labelled an outlier
    pub fn threshold(&self) -> Result<f64> {
        Ok(self.fitted()?.threshold)
    }

    /// Training labels: 1 for outliers, 0 for inliers
    pub fn labels(&self) -> Result<&[u8]> {
        Ok(&self.fitted()?.labels)
    }

    /// Summary statistics of the training scores
    pub fn score_stats(&self) -> Result<ScoreStats> {
        Ok(self.fitted()?.stats)
    }

    /// Indices of the training points labelled as outliers
    pub fn find_outliers(&self) -> Result<Vec<usize>> {
        Ok(self
            .fitted()?
            .labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == 1)
            .map(|(i, _)| i)
            .collect())
    }

    /// Label the points of `x` with the fitted threshold
    pub fn predict(&self, x: &FeatureMatrix) -> Result<Vec<u8>> {
        let threshold = self.fitted()?.threshold;
        Ok(binarize(&self.score(x)?, threshold))
    }

    /// Fit on `x` and return its labels
    pub fn fit_predict(&mut self, x: &FeatureMatrix) -> Result<Vec<u8>> {
        self.fit(x)?;
        Ok(self.labels()?.to_vec())
    }

    /// Outlier probability of every point of `x`, calibrated on the
    /// training scores
    pub fn predict_proba(&self, x: &FeatureMatrix, method: ProbabilityMethod) -> Result<Vec<f64>> {
        let stats = self.fitted()?.stats;
        Ok(method.apply(&stats, &self.score(x)?))
    }
}
