//! # Needle SOD - Subspace Outlier Detection
//!
//! Finds points that are unusual only in some of their dimensions. For
//! every point, Needle SOD picks a reference set of points that share many
//! of its nearest neighbors, finds the axes along which that reference set
//! is tightly concentrated, and scores the point by how far it strays from
//! the reference set along exactly those axes.
//!
//! ## Quick Start
//!
//! ```rust
//! use needle_sod::{FeatureMatrix, Sod, SodConfig};
//!
//! fn main() -> needle_sod::Result<()> {
//!     // Thirty points on a slightly noisy line, one point far off it
//!     let mut rows: Vec<Vec<f64>> = (0..30)
//!         .map(|i| vec![0.1 * i as f64, 0.01 * (i % 3) as f64])
//!         .collect();
//!     rows.push(vec![1.5, 3.0]);
//!     let x = FeatureMatrix::from_rows(&rows)?;
//!
//!     let mut sod = Sod::new(SodConfig::default())?;
//!     sod.fit(&x)?;
//!
//!     let scores = sod.decision_scores()?;
//!     let top = (0..scores.len())
//!         .max_by(|&a, &b| scores[a].total_cmp(&scores[b]))
//!         .unwrap_or(0);
//!     assert_eq!(top, 30);
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! - **k-NN search** ([`knn`]): exact brute-force by default, or any
//!   [`NeighborSearch`] implementation
//! - **Reference sets** ([`snn`]): shared-nearest-neighbor similarity with
//!   a deterministic tie-break
//! - **Subspace scoring** ([`subspace`]): relevant axes and RMS deviation
//! - **Thresholding** ([`threshold`]): contamination percentile, labels and
//!   outlier probabilities

#![warn(missing_docs)]

pub mod config;
pub mod detector;
pub mod distance;
pub mod error;
pub mod knn;
pub mod matrix;
pub mod snn;
pub mod subspace;
pub mod threshold;

pub use config::SodConfig;
pub use detector::Sod;
pub use distance::DistanceFunction;
pub use error::{ErrorCode, Recoverable, RecoveryHint, Result, SodError};
pub use knn::{BruteForceKnn, NeighborSearch, PrecomputedNeighbors};
pub use matrix::{FeatureMatrix, IndexMatrix};
pub use snn::reference_sets;
pub use subspace::{SubspaceScore, SubspaceScorer};
pub use threshold::{binarize, contamination_threshold, ProbabilityMethod, ScoreStats};

/// Prelude module for convenient imports.
///
/// ```rust
/// use needle_sod::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::SodConfig;
    pub use crate::detector::Sod;
    pub use crate::distance::DistanceFunction;
    pub use crate::error::{Result, SodError};
    pub use crate::knn::NeighborSearch;
    pub use crate::matrix::FeatureMatrix;
    pub use crate::threshold::ProbabilityMethod;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_matrix(rng: &mut StdRng, n: usize, d: usize) -> FeatureMatrix {
        let data: Vec<f64> = (0..n * d).map(|_| rng.gen::<f64>()).collect();
        FeatureMatrix::new(data, d).unwrap()
    }

    #[test]
    fn test_end_to_end() {
        let mut rng = StdRng::seed_from_u64(7);
        let x = random_matrix(&mut rng, 60, 4);

        let mut sod = Sod::new(SodConfig::default()).unwrap();
        sod.fit(&x).unwrap();

        let scores = sod.decision_scores().unwrap();
        assert_eq!(scores.len(), 60);
        assert!(scores.iter().all(|s| s.is_finite() && *s >= 0.0));

        let labels = sod.labels().unwrap();
        let flagged = labels.iter().filter(|&&l| l == 1).count();
        assert!(flagged >= 1);
        assert_eq!(flagged, sod.find_outliers().unwrap().len());
    }

    #[test]
    fn test_pipeline_pieces_compose() {
        let mut rng = StdRng::seed_from_u64(11);
        let x = random_matrix(&mut rng, 40, 3);
        let config = SodConfig::default().with_n_neighbors(8).with_ref_set(5);

        let knn = BruteForceKnn::new(config.distance).kneighbors(&x, 8).unwrap();
        let refs = reference_sets(&knn, 5).unwrap();
        let manual = SubspaceScorer::new(config.alpha).unwrap().score(&x, &refs).unwrap();

        let sod = Sod::new(config).unwrap();
        assert_eq!(sod.score(&x).unwrap(), manual);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(3);
        let x = random_matrix(&mut rng, 50, 5);
        let sod = Sod::new(SodConfig::default()).unwrap();
        assert_eq!(sod.score(&x).unwrap(), sod.score(&x).unwrap());
    }
}
