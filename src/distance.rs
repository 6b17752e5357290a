//! Distance Functions for Neighbor Search
//!
//! Metrics used by the built-in brute-force k-nearest-neighbor search. They
//! operate on `f64` feature rows, the same precision the subspace scorer
//! works in.
//!
//! # Supported Distance Functions
//!
//! - **Euclidean (L2)**: Standard geometric distance (default).
//! - **Squared Euclidean**: Same neighbor ordering as L2 without the square root.
//! - **Manhattan (L1)**: Sum of absolute differences.
//! - **Chebyshev (L∞)**: Largest absolute coordinate difference.
//! - **Cosine**: 1 - cosine similarity.
//!
//! # Example
//!
//! ```
//! use needle_sod::{DistanceFunction, distance::euclidean_distance};
//!
//! let a = [0.0, 0.0, 0.0];
//! let b = [1.0, 2.0, 2.0];
//! assert!((euclidean_distance(&a, &b) - 3.0).abs() < 1e-12);
//! assert!((DistanceFunction::Manhattan.compute(&a, &b) - 5.0).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SodError;

/// Distance function types for neighbor search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceFunction {
    /// Euclidean (L2) distance
    #[default]
    Euclidean,
    /// Squared Euclidean distance (ranks neighbors exactly like L2)
    SquaredEuclidean,
    /// Manhattan (L1) distance
    Manhattan,
    /// Chebyshev (L-infinity) distance
    Chebyshev,
    /// Cosine distance (1 - cosine similarity)
    Cosine,
}

impl DistanceFunction {
    /// Compute distance between two vectors
    #[inline]
    pub fn compute(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Self::Euclidean => euclidean_distance(a, b),
            Self::SquaredEuclidean => euclidean_distance_squared(a, b),
            Self::Manhattan => manhattan_distance(a, b),
            Self::Chebyshev => chebyshev_distance(a, b),
            Self::Cosine => cosine_distance(a, b),
        }
    }

    /// Canonical lowercase name, as accepted by [`FromStr`]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::SquaredEuclidean => "sqeuclidean",
            Self::Manhattan => "manhattan",
            Self::Chebyshev => "chebyshev",
            Self::Cosine => "cosine",
        }
    }
}

impl fmt::Display for DistanceFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistanceFunction {
    type Err = SodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "euclidean" | "l2" => Ok(Self::Euclidean),
            "sqeuclidean" | "squared_euclidean" => Ok(Self::SquaredEuclidean),
            "manhattan" | "l1" | "cityblock" => Ok(Self::Manhattan),
            "chebyshev" | "linf" => Ok(Self::Chebyshev),
            "cosine" => Ok(Self::Cosine),
            other => Err(SodError::InvalidConfig(format!(
                "unknown distance function '{}' (expected euclidean, sqeuclidean, manhattan, chebyshev or cosine)",
                other
            ))),
        }
    }
}

/// Compute Euclidean (L2) distance
///
/// # Panics
/// Panics if `a` and `b` have different lengths.
#[inline]
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    euclidean_distance_squared(a, b).sqrt()
}

/// Compute squared Euclidean distance (faster, for comparisons)
///
/// # Panics
/// Panics if `a` and `b` have different lengths.
#[inline]
pub fn euclidean_distance_squared(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "vectors must have equal length for euclidean distance");
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

/// Compute Manhattan (L1) distance
///
/// # Panics
/// Panics if `a` and `b` have different lengths.
#[inline]
pub fn manhattan_distance(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "vectors must have equal length for manhattan distance");
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
}

/// Compute Chebyshev (L-infinity) distance
///
/// # Panics
/// Panics if `a` and `b` have different lengths.
#[inline]
pub fn chebyshev_distance(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "vectors must have equal length for chebyshev distance");
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// Compute cosine distance (1 - cosine similarity)
///
/// A zero vector has no direction; its distance to anything is 1.0.
///
/// # Panics
/// Panics if `a` and `b` have different lengths.
#[inline]
pub fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "vectors must have equal length for cosine distance");
    let dot = dot_product(a, b);
    let norm_a = dot_product(a, a).sqrt();
    let norm_b = dot_product(b, b).sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    // Rounding can push the ratio slightly past 1
    (1.0 - dot / (norm_a * norm_b)).max(0.0)
}

/// Compute dot product of two vectors
#[inline]
pub fn dot_product(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance() {
        let a = [0.0, 0.0, 0.0];
        let b = [1.0, 2.0, 2.0];
        assert!((euclidean_distance(&a, &b) - 3.0).abs() < 1e-12);
        assert!((euclidean_distance_squared(&a, &b) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_manhattan_distance() {
        let a = [0.0, 0.0, 0.0];
        let b = [1.0, -2.0, 3.0];
        assert!((manhattan_distance(&a, &b) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_chebyshev_distance() {
        let a = [1.0, 5.0, -2.0];
        let b = [2.0, 1.0, -2.5];
        assert!((chebyshev_distance(&a, &b) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_distance() {
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-12);
        assert!(cosine_distance(&[2.0, 0.0], &[1.0, 0.0]).abs() < 1e-12);
        assert!((cosine_distance(&[0.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_distance_function() {
        assert_eq!("L2".parse::<DistanceFunction>().unwrap(), DistanceFunction::Euclidean);
        assert_eq!("cityblock".parse::<DistanceFunction>().unwrap(), DistanceFunction::Manhattan);
        assert_eq!(
            DistanceFunction::SquaredEuclidean.name().parse::<DistanceFunction>().unwrap(),
            DistanceFunction::SquaredEuclidean
        );
        assert!(matches!(
            "hamming".parse::<DistanceFunction>(),
            Err(SodError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&DistanceFunction::SquaredEuclidean).unwrap();
        assert_eq!(json, "\"squared_euclidean\"");
        let parsed: DistanceFunction = serde_json::from_str("\"manhattan\"").unwrap();
        assert_eq!(parsed, DistanceFunction::Manhattan);
    }
}
