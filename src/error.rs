//! Error Types and Handling
//!
//! Error types for subspace outlier detection with structured error codes
//! for programmatic handling and recovery hints for people reading them.
//!
//! # Error Categories
//!
//! | Range | Category | Examples |
//! |-------|----------|----------|
//! | 1xxx | I/O | Read, Write, Permission |
//! | 2xxx | Serialization | Serialize, Deserialize |
//! | 4xxx | Input | Empty, DimensionMismatch, InvalidVector, InsufficientSamples |
//! | 6xxx | Index | InvalidIndex |
//! | 7xxx | Configuration | InvalidConfig |
//! | 13xxx | State | NotFitted |
//!
//! The core computation is deterministic, so no error is retryable: a
//! failure is surfaced immediately and nothing is partially recovered.
//!
//! # Example
//!
//! ```rust
//! use needle_sod::{Recoverable, Sod, SodConfig, SodError};
//!
//! let err = Sod::new(SodConfig::default().with_ref_set(25)).unwrap_err();
//! assert!(matches!(err, SodError::InvalidConfig(_)));
//! assert_eq!(err.error_code().code(), 7001);
//! assert!(!err.is_retryable());
//! ```

use thiserror::Error;

/// Error code categories for programmatic error handling.
///
/// Each error code belongs to a category indicated by its numeric range.
/// Use [`ErrorCode::category()`] to get the human-readable category name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Failed to read input
    IoRead = 1001,
    /// Failed to write output
    IoWrite = 1002,
    /// Insufficient file system permissions
    IoPermission = 1003,

    /// Failed to serialize data
    SerializationFailed = 2001,
    /// Failed to deserialize data (malformed JSON, wrong shape)
    DeserializationFailed = 2002,

    /// The feature matrix has no rows or no columns
    EmptyInput = 4001,
    /// Rows of the feature matrix disagree on their length
    DimensionMismatch = 4003,
    /// The feature matrix contains NaN or Infinity
    InvalidVector = 4004,
    /// Fewer samples than the neighbourhood requires
    InsufficientSamples = 4005,

    /// A neighbor or reference-set index matrix is malformed
    InvalidIndex = 6001,

    /// Configuration value is out of range
    InvalidConfig = 7001,

    /// The detector has not been fitted yet
    NotFitted = 13002,
}

impl ErrorCode {
    /// Get the numeric error code
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a brief description of the error category
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::IoRead | ErrorCode::IoWrite | ErrorCode::IoPermission => "I/O",
            ErrorCode::SerializationFailed | ErrorCode::DeserializationFailed => "Serialization",
            ErrorCode::EmptyInput
            | ErrorCode::DimensionMismatch
            | ErrorCode::InvalidVector
            | ErrorCode::InsufficientSamples => "Input",
            ErrorCode::InvalidIndex => "Index",
            ErrorCode::InvalidConfig => "Configuration",
            ErrorCode::NotFitted => "State",
        }
    }
}

/// A recovery hint providing actionable guidance for resolving errors
#[derive(Debug, Clone)]
pub struct RecoveryHint {
    /// Short summary of the recovery action
    pub summary: String,
    /// Detailed steps or explanation
    pub details: Option<String>,
}

impl RecoveryHint {
    /// Create a new recovery hint with just a summary
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            details: None,
        }
    }

    /// Add detailed recovery steps
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl std::fmt::Display for RecoveryHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary)?;
        if let Some(details) = &self.details {
            write!(f, "\n  Details: {}", details)?;
        }
        Ok(())
    }
}

/// Trait for errors that can provide recovery hints
pub trait Recoverable {
    /// Get the error code for this error
    fn error_code(&self) -> ErrorCode;

    /// Get recovery hints for this error
    fn recovery_hints(&self) -> Vec<RecoveryHint>;

    /// Check if the error is retryable
    fn is_retryable(&self) -> bool;
}

/// Error types for outlier detection
#[must_use]
#[derive(Error, Debug)]
pub enum SodError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Empty input: the feature matrix needs at least one row and one column")]
    EmptyInput,

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    #[error("Insufficient samples: {n_samples} samples cannot provide {n_neighbors} neighbors per point")]
    InsufficientSamples { n_samples: usize, n_neighbors: usize },

    #[error("Invalid index matrix: {0}")]
    InvalidIndex(String),

    #[error("Detector is not fitted; call fit() first")]
    NotFitted,
}

impl Recoverable for SodError {
    fn error_code(&self) -> ErrorCode {
        match self {
            SodError::Io(source) => match source.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoRead,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoWrite,
            },
            SodError::Serialization(source) => {
                if source.is_io() {
                    ErrorCode::SerializationFailed
                } else {
                    ErrorCode::DeserializationFailed
                }
            }
            SodError::InvalidConfig(_) => ErrorCode::InvalidConfig,
            SodError::EmptyInput => ErrorCode::EmptyInput,
            SodError::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            SodError::InvalidVector(_) => ErrorCode::InvalidVector,
            SodError::InsufficientSamples { .. } => ErrorCode::InsufficientSamples,
            SodError::InvalidIndex(_) => ErrorCode::InvalidIndex,
            SodError::NotFitted => ErrorCode::NotFitted,
        }
    }

    fn recovery_hints(&self) -> Vec<RecoveryHint> {
        match self {
            SodError::Io(source) => match source.kind() {
                std::io::ErrorKind::NotFound => vec![
                    RecoveryHint::new("Verify the input file exists")
                        .with_details("Check the path spelling, or pass '-' to read from stdin"),
                ],
                std::io::ErrorKind::PermissionDenied => vec![
                    RecoveryHint::new("Check file permissions")
                        .with_details("Ensure the process has read access to the input file"),
                ],
                _ => vec![RecoveryHint::new("Check that the input stream is readable")],
            },

            SodError::Serialization(_) => vec![
                RecoveryHint::new("Check the JSON input format")
                    .with_details("Feature matrices are arrays of equal-length arrays of numbers"),
                RecoveryHint::new("Configuration files are JSON objects with n_neighbors, ref_set, alpha, contamination"),
            ],

            SodError::InvalidConfig(reason) => vec![
                RecoveryHint::new(format!("Fix configuration: {}", reason)),
                RecoveryHint::new("Start from SodConfig::default() (n_neighbors=20, ref_set=10, alpha=0.8, contamination=0.1)"),
            ],

            SodError::EmptyInput => vec![
                RecoveryHint::new("Provide at least one sample with at least one feature"),
            ],

            SodError::DimensionMismatch { expected, got } => vec![
                RecoveryHint::new(format!(
                    "Make every row {} features wide (found a row with {})",
                    expected, got
                ))
                .with_details("All samples must share the same feature space"),
            ],

            SodError::InvalidVector(reason) => vec![
                RecoveryHint::new(format!("Fix feature data: {}", reason)),
                RecoveryHint::new("Impute or drop samples containing NaN or Infinity"),
            ],

            SodError::InsufficientSamples {
                n_samples,
                n_neighbors,
            } => vec![
                RecoveryHint::new(format!(
                    "Provide more than {} samples, or lower n_neighbors below {}",
                    n_neighbors, n_samples
                )),
                RecoveryHint::new("ref_set must stay below n_neighbors when lowering it"),
            ],

            SodError::InvalidIndex(reason) => vec![
                RecoveryHint::new(format!("Fix the index matrix: {}", reason)),
                RecoveryHint::new(
                    "Each row must hold distinct in-range indices that exclude the row itself",
                ),
            ],

            SodError::NotFitted => vec![
                RecoveryHint::new("Call fit() on the training data before querying labels or thresholds"),
            ],
        }
    }

    fn is_retryable(&self) -> bool {
        false
    }
}

impl SodError {
    /// Get a formatted error message with recovery hints
    pub fn format_with_hints(&self) -> String {
        let hints = self.recovery_hints();
        let mut output = format!("Error [{}]: {}", self.error_code().code(), self);

        if !hints.is_empty() {
            output.push_str("\n\nRecovery suggestions:");
            for (i, hint) in hints.iter().enumerate() {
                output.push_str(&format!("\n  {}. {}", i + 1, hint));
            }
        }

        output
    }

    /// Returns a concise, actionable help string for the most common errors.
    pub fn help(&self) -> String {
        match self {
            SodError::InvalidConfig(reason) => format!(
                "Invalid detector configuration: {}. \
                 Valid ranges: n_neighbors >= 2, 1 <= ref_set < n_neighbors, \
                 0 < alpha < 1, 0 < contamination < 0.5.",
                reason
            ),
            SodError::InsufficientSamples {
                n_samples,
                n_neighbors,
            } => format!(
                "The dataset has {} samples but each point needs {} neighbors other than itself. \
                 Use a smaller n_neighbors or more data.",
                n_samples, n_neighbors
            ),
            SodError::NotFitted => String::from(
                "The detector holds no training scores yet. Call fit() first.",
            ),
            _ => {
                let hints = self.recovery_hints();
                hints.first().map(|h| h.to_string()).unwrap_or_default()
            }
        }
    }
}

/// Result type alias for outlier detection operations
pub type Result<T> = std::result::Result<T, SodError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let error = SodError::InvalidConfig("alpha".to_string());
        assert_eq!(error.error_code(), ErrorCode::InvalidConfig);
        assert_eq!(error.error_code().code(), 7001);
        assert_eq!(error.error_code().category(), "Configuration");

        assert_eq!(SodError::NotFitted.error_code().category(), "State");
        assert_eq!(
            SodError::InsufficientSamples { n_samples: 5, n_neighbors: 20 }
                .error_code()
                .code(),
            4005
        );
    }

    #[test]
    fn test_nothing_is_retryable() {
        assert!(!SodError::NotFitted.is_retryable());
        assert!(!SodError::EmptyInput.is_retryable());
        assert!(!SodError::InvalidIndex("x".into()).is_retryable());
    }

    #[test]
    fn test_dimension_mismatch_hints() {
        let error = SodError::DimensionMismatch { expected: 3, got: 5 };
        let hints = error.recovery_hints();
        assert!(hints.iter().any(|h| h.summary.contains('3') && h.summary.contains('5')));
    }

    #[test]
    fn test_format_with_hints() {
        let error = SodError::InvalidConfig("ref_set must be smaller than n_neighbors".to_string());
        let formatted = error.format_with_hints();
        assert!(formatted.contains("Error [7001]"));
        assert!(formatted.contains("ref_set must be smaller"));
        assert!(formatted.contains("Recovery suggestions"));
    }

    #[test]
    fn test_io_error_codes_by_kind() {
        let error = SodError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        assert_eq!(error.error_code(), ErrorCode::IoRead);
        assert!(error.recovery_hints().iter().any(|h| h.summary.contains("exists")));

        let error = SodError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(error.error_code(), ErrorCode::IoPermission);
    }

    #[test]
    fn test_malformed_json_is_deserialization_failure() {
        let err: SodError = serde_json::from_str::<Vec<f64>>("[1.0,").unwrap_err().into();
        assert_eq!(err.error_code(), ErrorCode::DeserializationFailed);
    }

    #[test]
    fn test_help_insufficient_samples() {
        let help = SodError::InsufficientSamples { n_samples: 8, n_neighbors: 20 }.help();
        assert!(help.contains('8'));
        assert!(help.contains("20"));
    }

    #[test]
    fn test_help_fallback_to_recovery_hints() {
        let help = SodError::EmptyInput.help();
        assert!(!help.is_empty());
    }
}
