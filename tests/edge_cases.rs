//! Edge case tests for subspace outlier detection
//! Tests boundary conditions, error handling, and unusual inputs

use needle_sod::{
    reference_sets, ErrorCode, FeatureMatrix, IndexMatrix, Recoverable, Sod, SodConfig, SodError,
    SubspaceScorer,
};

fn line(n: usize) -> FeatureMatrix {
    let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64, (i * i) as f64 * 0.01]).collect();
    FeatureMatrix::from_rows(&rows).unwrap()
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_ref_set_larger_than_n_neighbors_fails_before_data() {
    let err = Sod::new(SodConfig::default().with_n_neighbors(20).with_ref_set(25)).unwrap_err();
    assert!(matches!(err, SodError::InvalidConfig(_)));
    assert_eq!(err.error_code(), ErrorCode::InvalidConfig);
}

#[test]
fn test_ref_set_equal_to_n_neighbors_fails() {
    assert!(Sod::new(SodConfig::default().with_n_neighbors(10).with_ref_set(10)).is_err());
}

#[test]
fn test_zero_sizes_fail() {
    assert!(Sod::new(SodConfig::default().with_n_neighbors(0).with_ref_set(0)).is_err());
    assert!(Sod::new(SodConfig::default().with_ref_set(0)).is_err());
}

#[test]
fn test_alpha_and_contamination_bounds() {
    for alpha in [0.0, 1.0, -1.0, 2.0] {
        assert!(Sod::new(SodConfig::default().with_alpha(alpha)).is_err());
    }
    for contamination in [0.0, 0.5, 0.75] {
        assert!(Sod::new(SodConfig::default().with_contamination(contamination)).is_err());
    }
}

#[test]
fn test_smallest_valid_neighborhood() {
    let config = SodConfig::default().with_n_neighbors(2).with_ref_set(1);
    let scores = Sod::new(config).unwrap().score(&line(3)).unwrap();
    assert_eq!(scores.len(), 3);
    assert!(scores.iter().all(|s| s.is_finite() && *s >= 0.0));
}

// ============================================================================
// Input shape
// ============================================================================

#[test]
fn test_empty_input() {
    let rows: Vec<Vec<f64>> = Vec::new();
    assert!(matches!(FeatureMatrix::from_rows(&rows), Err(SodError::EmptyInput)));
    assert!(matches!(FeatureMatrix::from_rows(&[Vec::<f64>::new()]), Err(SodError::EmptyInput)));
    assert!(matches!(FeatureMatrix::new(vec![], 3), Err(SodError::EmptyInput)));
}

#[test]
fn test_ragged_rows() {
    let err = FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
    assert!(matches!(err, SodError::DimensionMismatch { expected: 2, got: 1 }));
}

#[test]
fn test_non_finite_values() {
    assert!(matches!(
        FeatureMatrix::from_rows(&[[0.0, f64::NAN]]),
        Err(SodError::InvalidVector(_))
    ));
    assert!(matches!(
        FeatureMatrix::from_rows(&[[f64::NEG_INFINITY, 0.0]]),
        Err(SodError::InvalidVector(_))
    ));
}

#[test]
fn test_too_few_samples_for_neighborhood() {
    let sod = Sod::new(SodConfig::default()).unwrap();
    let err = sod.score(&line(20)).unwrap_err();
    assert!(matches!(err, SodError::InsufficientSamples { n_samples: 20, n_neighbors: 20 }));
    assert_eq!(err.error_code().category(), "Input");

    // One more row is enough
    assert_eq!(sod.score(&line(21)).unwrap().len(), 21);
}

#[test]
fn test_single_feature() {
    let rows: Vec<Vec<f64>> = (0..25).map(|i| vec![(i % 5) as f64]).collect();
    let x = FeatureMatrix::from_rows(&rows).unwrap();
    let scores = Sod::new(SodConfig::default()).unwrap().score(&x).unwrap();
    // With one axis, var < alpha * var is impossible unless the
    // reference set is constant; scores are either 0 or a plain distance
    assert_eq!(scores.len(), 25);
    assert!(scores.iter().all(|s| s.is_finite() && *s >= 0.0));
}

#[test]
fn test_duplicate_points_alongside_distinct_ones() {
    let mut rows = vec![vec![1.0, 1.0]; 12];
    rows.extend((0..12).map(|i| vec![5.0 + i as f64, 0.5 * i as f64]));
    let x = FeatureMatrix::from_rows(&rows).unwrap();
    let scores = Sod::new(SodConfig::default().with_n_neighbors(8).with_ref_set(4))
        .unwrap()
        .score(&x)
        .unwrap();
    // Each duplicate's reference set is made of its copies
    assert!(scores[..12].iter().all(|&s| s == 0.0));
}

// ============================================================================
// Index matrices
// ============================================================================

#[test]
fn test_index_matrix_rejects_self_reference() {
    let err = IndexMatrix::from_rows(vec![vec![0], vec![0]]).unwrap_err();
    assert!(matches!(err, SodError::InvalidIndex(_)));
}

#[test]
fn test_index_matrix_rejects_out_of_range_and_duplicates() {
    assert!(IndexMatrix::from_rows(vec![vec![5], vec![0]]).is_err());
    assert!(IndexMatrix::from_rows(vec![vec![1, 1], vec![0, 2], vec![0, 1]]).is_err());
    assert!(IndexMatrix::from_rows(vec![vec![1, 2], vec![0], vec![0, 1]]).is_err());
}

#[test]
fn test_reference_set_must_be_smaller_than_neighbor_width() {
    let nn = IndexMatrix::from_rows(vec![vec![1, 2], vec![0, 2], vec![0, 1]]).unwrap();
    assert!(matches!(reference_sets(&nn, 2), Err(SodError::InvalidConfig(_))));
    assert_eq!(reference_sets(&nn, 1).unwrap().width(), 1);
}

#[test]
fn test_scorer_rejects_mismatched_reference_sets() {
    let refs = IndexMatrix::from_rows(vec![vec![1], vec![0]]).unwrap();
    let err = SubspaceScorer::new(0.8).unwrap().score(&line(3), &refs).unwrap_err();
    assert!(matches!(err, SodError::InvalidIndex(_)));
}

// ============================================================================
// Fitted state
// ============================================================================

#[test]
fn test_not_fitted_errors_carry_hints() {
    let sod = Sod::new(SodConfig::default()).unwrap();
    let err = sod.labels().unwrap_err();
    assert!(matches!(err, SodError::NotFitted));
    assert!(!err.recovery_hints().is_empty());
    assert!(err.format_with_hints().contains("fit"));
}

#[test]
fn test_refit_replaces_state() {
    let mut sod = Sod::new(SodConfig::default().with_n_neighbors(5).with_ref_set(3)).unwrap();
    sod.fit(&line(12)).unwrap();
    assert_eq!(sod.decision_scores().unwrap().len(), 12);
    sod.fit(&line(30)).unwrap();
    assert_eq!(sod.decision_scores().unwrap().len(), 30);
}
