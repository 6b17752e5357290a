//! Score Thresholding and Probability Calibration
//!
//! Turns a vector of raw outlier scores into binary labels and outlier
//! probabilities. The cut-off is chosen so that roughly a `contamination`
//! fraction of the training points lie at or above it.
//!
//! # Example
//!
//! ```
//! use needle_sod::threshold::{binarize, contamination_threshold};
//!
//! let scores = [0.1, 0.2, 0.3, 0.4, 5.0];
//! let t = contamination_threshold(&scores, 0.2).unwrap();
//! assert_eq!(binarize(&scores, t), vec![0, 0, 0, 0, 1]);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SodError};

/// Check that `contamination` lies in the open interval (0, 0.5)
pub fn validate_contamination(contamination: f64) -> Result<()> {
    if !(contamination > 0.0 && contamination < 0.5) {
        return Err(SodError::InvalidConfig(format!(
            "contamination must be in (0, 0.5), got {}",
            contamination
        )));
    }
    Ok(())
}

/// The `q`-th percentile (0..=100) of `values`, interpolating linearly
/// between the two nearest order statistics.
///
/// # Errors
/// Returns [`SodError::EmptyInput`] for an empty slice and
/// [`SodError::InvalidConfig`] if `q` is outside `[0, 100]`.
pub fn percentile(values: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(SodError::EmptyInput);
    }
    if !(0.0..=100.0).contains(&q) {
        return Err(SodError::InvalidConfig(format!(
            "percentile must be in [0, 100], got {}",
            q
        )));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    let (a, b) = (sorted[lo], sorted[hi]);
    Ok((a + (b - a) * frac).clamp(a, b))
}

/// Score cut-off that marks a `contamination` fraction of `scores` as
/// outliers: the `(1 - contamination)` percentile.
pub fn contamination_threshold(scores: &[f64], contamination: f64) -> Result<f64> {
    validate_contamination(contamination)?;
    percentile(scores, 100.0 * (1.0 - contamination))
}

/// Label each score: 1 if it is at or above `threshold`, otherwise 0
pub fn binarize(scores: &[f64], threshold: f64) -> Vec<u8> {
    scores.iter().map(|&s| u8::from(s >= threshold)).collect()
}

/// Summary of the training scores used to calibrate probabilities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    /// Smallest training score
    pub min: f64,
    /// Largest training score
    pub max: f64,
    /// Mean training score
    pub mean: f64,
    /// Population standard deviation of the training scores
    pub std: f64,
}

impl ScoreStats {
    /// Summarize a non-empty score vector
    pub fn from_scores(scores: &[f64]) -> Result<Self> {
        if scores.is_empty() {
            return Err(SodError::EmptyInput);
        }
        let n = scores.len() as f64;
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = scores.iter().sum::<f64>() / n;
        let var = scores.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n;
        Ok(Self {
            min,
            max,
            mean,
            std: var.sqrt(),
        })
    }
}

/// How raw scores are mapped onto outlier probabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbabilityMethod {
    /// Min-max scaling against the training score range, clipped to [0, 1]
    #[default]
    Linear,
    /// Gaussian scaling: `max(0, erf((s - mean) / (std * sqrt(2))))`
    Unify,
}

impl ProbabilityMethod {
    /// Convert `scores` to probabilities calibrated on `stats`.
    ///
    /// With a zero training range, linear scaling uses a unit range; with a
    /// zero training deviation, unify maps scores above the mean to 1 and
    /// everything else to 0.
    pub fn apply(&self, stats: &ScoreStats, scores: &[f64]) -> Vec<f64> {
        match self {
            Self::Linear => {
                let range = stats.max - stats.min;
                let range = if range > 0.0 { range } else { 1.0 };
                scores
                    .iter()
                    .map(|&s| ((s - stats.min) / range).clamp(0.0, 1.0))
                    .collect()
            }
            Self::Unify => scores
                .iter()
                .map(|&s| {
                    if stats.std > 0.0 {
                        erf((s - stats.mean) / (stats.std * std::f64::consts::SQRT_2))
                            .clamp(0.0, 1.0)
                    } else if s > stats.mean {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Unify => "unify",
        }
    }
}

impl fmt::Display for ProbabilityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProbabilityMethod {
    type Err = SodError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "unify" => Ok(Self::Unify),
            other => Err(SodError::InvalidConfig(format!(
                "unknown probability method '{}' (expected linear or unify)",
                other
            ))),
        }
    }
}

/// Error function, Abramowitz & Stegun 7.1.26 (absolute error < 1.5e-7)
fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}
