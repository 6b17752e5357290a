//! Dense row-major matrices
//!
//! [`FeatureMatrix`] is the validated n × d input every detector operation
//! works on: at least one row and one column, rectangular, finite.
//! [`IndexMatrix`] holds per-point index lists (k-nearest neighbors or
//! reference sets) with the invariants the SNN builder relies on.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SodError};

/// Validated n × d matrix of `f64` features stored row-major.
///
/// Serializes as a list of rows, `[[f64, ...], ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    data: Vec<f64>,
    n_samples: usize,
    n_features: usize,
}

impl FeatureMatrix {
    /// Build a matrix from a flat row-major buffer.
    ///
    /// # Errors
    ///
    /// - [`SodError::EmptyInput`] - no data or `n_features == 0`
    /// - [`SodError::DimensionMismatch`] - buffer length is not a multiple of `n_features`
    /// - [`SodError::InvalidVector`] - a value is NaN or infinite
    pub fn new(data: Vec<f64>, n_features: usize) -> Result<Self> {
        if data.is_empty() || n_features == 0 {
            return Err(SodError::EmptyInput);
        }
        if data.len() % n_features != 0 {
            return Err(SodError::DimensionMismatch {
                expected: n_features,
                got: data.len() % n_features,
            });
        }
        let n_samples = data.len() / n_features;
        validate_finite(&data, n_features)?;
        Ok(Self {
            data,
            n_samples,
            n_features,
        })
    }

    /// Build a matrix from a slice of rows.
    ///
    /// The first row fixes the feature count; every other row must match it.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let n_features = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        if n_features == 0 {
            return Err(SodError::EmptyInput);
        }

        let mut data = Vec::with_capacity(rows.len() * n_features);
        for row in rows {
            let row = row.as_ref();
            if row.len() != n_features {
                return Err(SodError::DimensionMismatch {
                    expected: n_features,
                    got: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        validate_finite(&data, n_features)?;

        Ok(Self {
            n_samples: rows.len(),
            n_features,
            data,
        })
    }

    /// Number of rows (samples)
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Number of columns (features)
    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Row `i` as a slice.
    ///
    /// # Panics
    /// Panics if `i >= n_samples()`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        let start = i * self.n_features;
        &self.data[start..start + self.n_features]
    }

    /// Iterate over rows in order
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.data.chunks_exact(self.n_features)
    }

    /// The underlying row-major buffer
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Copy the rows out as nested vectors
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.rows().map(<[f64]>::to_vec).collect()
    }

    /// New matrix whose row `i` is row `order[i]` of this one.
    ///
    /// # Errors
    /// Returns [`SodError::InvalidIndex`] if `order` is not a permutation
    /// of `0..n_samples()`.
    pub fn permuted(&self, order: &[usize]) -> Result<Self> {
        if order.len() != self.n_samples {
            return Err(SodError::InvalidIndex(format!(
                "permutation has {} entries for {} rows",
                order.len(),
                self.n_samples
            )));
        }
        let mut seen = vec![false; self.n_samples];
        let mut data = Vec::with_capacity(self.data.len());
        for &src in order {
            if src >= self.n_samples || std::mem::replace(&mut seen[src], true) {
                return Err(SodError::InvalidIndex(format!(
                    "{} is out of range or repeated in the permutation",
                    src
                )));
            }
            data.extend_from_slice(self.row(src));
        }
        Ok(Self {
            data,
            n_samples: self.n_samples,
            n_features: self.n_features,
        })
    }
}

impl TryFrom<Vec<Vec<f64>>> for FeatureMatrix {
    type Error = SodError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        Self::from_rows(&rows)
    }
}

impl Serialize for FeatureMatrix {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.rows())
    }
}

impl<'de> Deserialize<'de> for FeatureMatrix {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let rows = Vec::<Vec<f64>>::deserialize(deserializer)?;
        Self::from_rows(&rows).map_err(serde::de::Error::custom)
    }
}

/// Reject NaN and infinite values, reporting the first offending cell
fn validate_finite(data: &[f64], n_features: usize) -> Result<()> {
    for (i, &val) in data.iter().enumerate() {
        if val.is_nan() {
            return Err(SodError::InvalidVector(format!(
                "NaN at row {}, column {}",
                i / n_features,
                i % n_features
            )));
        }
        if val.is_infinite() {
            return Err(SodError::InvalidVector(format!(
                "Inf at row {}, column {}",
                i / n_features,
                i % n_features
            )));
        }
    }
    Ok(())
}

/// Per-point lists of point indices, all of the same width.
///
/// Every row `i` holds `width()` distinct indices in `0..n_rows()`, none of
/// them equal to `i`. Both the k-nearest-neighbor matrix and the
/// reference-set matrix use this type. Serializes as a list of rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMatrix {
    data: Vec<usize>,
    n_rows: usize,
    width: usize,
}

impl IndexMatrix {
    /// Build and validate an index matrix over `rows.len()` points.
    ///
    /// # Errors
    /// Returns [`SodError::InvalidIndex`] for ragged rows, indices out of
    /// range, a row that references itself, or repeated indices in a row.
    pub fn from_rows(rows: Vec<Vec<usize>>) -> Result<Self> {
        let n_rows = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(n_rows * width);
        let mut seen = vec![usize::MAX; n_rows];

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(SodError::InvalidIndex(format!(
                    "row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    width
                )));
            }
            for &j in &row {
                if j >= n_rows {
                    return Err(SodError::InvalidIndex(format!(
                        "row {} references point {} but there are only {} points",
                        i, j, n_rows
                    )));
                }
                if j == i {
                    return Err(SodError::InvalidIndex(format!("row {} references itself", i)));
                }
                // `seen[j] == i` means j already appeared in this row
                if seen[j] == i {
                    return Err(SodError::InvalidIndex(format!(
                        "row {} lists point {} more than once",
                        i, j
                    )));
                }
                seen[j] = i;
            }
            data.extend(row);
        }

        Ok(Self {
            data,
            n_rows,
            width,
        })
    }

    /// Build from a flat buffer produced by a trusted in-crate builder.
    pub(crate) fn from_flat(data: Vec<usize>, n_rows: usize, width: usize) -> Self {
        debug_assert_eq!(data.len(), n_rows * width);
        Self {
            data,
            n_rows,
            width,
        }
    }

    /// Number of points (rows)
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of indices per row
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Indices listed for point `i`.
    ///
    /// # Panics
    /// Panics if `i >= n_rows()`.
    #[inline]
    pub fn row(&self, i: usize) -> &[usize] {
        let start = i * self.width;
        &self.data[start..start + self.width]
    }

    /// Iterate over rows in order
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[usize]> + '_ {
        (0..self.n_rows).map(move |i| self.row(i))
    }

    /// Copy the rows out as nested vectors
    pub fn to_rows(&self) -> Vec<Vec<usize>> {
        (0..self.n_rows).map(|i| self.row(i).to_vec()).collect()
    }
}

impl Serialize for IndexMatrix {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.rows())
    }
}
