//! Detector configuration.
//!
//! [`SodConfig`] holds every tunable of the detector. It can be built in
//! code through the `with_*` builder methods or loaded from JSON; fields
//! missing from the JSON take their default values.
//!
//! ```
//! use needle_sod::{DistanceFunction, SodConfig};
//!
//! let config = SodConfig::default()
//!     .with_n_neighbors(15)
//!     .with_ref_set(8)
//!     .with_distance(DistanceFunction::Manhattan);
//! assert!(config.validate().is_ok());
//!
//! let parsed = SodConfig::from_json_str(r#"{"alpha": 0.5}"#).unwrap();
//! assert_eq!(parsed.n_neighbors, 20);
//! assert_eq!(parsed.alpha, 0.5);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::distance::DistanceFunction;
use crate::error::{Result, SodError};
use crate::threshold::validate_contamination;

/// Configuration of a subspace outlier detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SodConfig {
    /// Neighbors per point in the k-NN graph (default: 20)
    pub n_neighbors: usize,
    /// Size of each shared-nearest-neighbor reference set (default: 10)
    pub ref_set: usize,
    /// Fraction of the average axis variance below which an axis counts as
    /// relevant (default: 0.8)
    pub alpha: f64,
    /// Expected share of outliers, used to pick the label threshold
    /// (default: 0.1)
    pub contamination: f64,
    /// Distance used by the built-in neighbor search (default: Euclidean)
    pub distance: DistanceFunction,
}

impl Default for SodConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 20,
            ref_set: 10,
            alpha: 0.8,
            contamination: 0.1,
            distance: DistanceFunction::Euclidean,
        }
    }
}

impl SodConfig {
    /// Create a validated configuration with the given neighborhood sizes
    /// and default values for everything else
    pub fn try_new(n_neighbors: usize, ref_set: usize) -> Result<Self> {
        let config = Self {
            n_neighbors,
            ref_set,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the number of neighbors
    #[must_use]
    pub fn with_n_neighbors(mut self, n_neighbors: usize) -> Self {
        self.n_neighbors = n_neighbors;
        self
    }

    /// Set the reference set size
    #[must_use]
    pub fn with_ref_set(mut self, ref_set: usize) -> Self {
        self.ref_set = ref_set;
        self
    }

    /// Set the variance fraction
    #[must_use]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the contamination
    #[must_use]
    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.contamination = contamination;
        self
    }

    /// Set the neighbor search distance
    #[must_use]
    pub fn with_distance(mut self, distance: DistanceFunction) -> Self {
        self.distance = distance;
        self
    }

    /// Check every parameter range.
    ///
    /// # Errors
    /// Returns [`SodError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.n_neighbors == 0 {
            return Err(SodError::InvalidConfig(
                "n_neighbors must be at least 1".to_string(),
            ));
        }
        if self.ref_set == 0 {
            return Err(SodError::InvalidConfig(
                "ref_set must be at least 1".to_string(),
            ));
        }
        if self.ref_set >= self.n_neighbors {
            return Err(SodError::InvalidConfig(format!(
                "ref_set ({}) must be smaller than n_neighbors ({})",
                self.ref_set, self.n_neighbors
            )));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(SodError::InvalidConfig(format!(
                "alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        validate_contamination(self.contamination)
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
