//! Integration test: preprocessing pipeline end-to-end

use ndarray::Array1;
use parkinson_detect::preprocessing::{
    prepare_data, split_features_target, stratified_split, PrepareConfig, Scaler, ScalerMethod,
};
use parkinson_detect::resampling::{class_counts, BalanceMethod};
use polars::prelude::*;

/// 20 voice-measurement rows, 14 positives and 6 negatives.
fn sample_df() -> DataFrame {
    let n = 20;
    let names: Vec<String> = (0..n).map(|i| format!("patient_{}", i)).collect();
    let jitter: Vec<f64> = (0..n).map(|i| 0.002 + 0.001 * (i as f64)).collect();
    let shimmer: Vec<f64> = (0..n).map(|i| 0.02 + 0.01 * (i as f64)).collect();
    let hnr: Vec<f64> = (0..n).map(|i| 21.0 - 0.5 * (i as f64)).collect();
    let status: Vec<i64> = (0..n).map(|i| if i % 10 < 7 { 1 } else { 0 }).collect();
    df!(
        "name" => names,
        "jitter" => jitter,
        "shimmer" => shimmer,
        "hnr" => hnr,
        "status" => status,
    )
    .unwrap()
}

// ============================================================================
// Feature/target split
// ============================================================================

#[test]
fn test_split_drops_identifier_and_target() {
    let df = sample_df();
    let (x, y, manifest) = split_features_target(&df, "status", &["name".to_string()]).unwrap();

    assert_eq!(
        manifest,
        vec!["jitter".to_string(), "shimmer".to_string(), "hnr".to_string()]
    );
    assert_eq!(x.nrows(), 20);
    assert_eq!(x.ncols(), 3);
    assert_eq!(y.len(), 20);
}

#[test]
fn test_split_missing_target_errors() {
    let df = sample_df();
    assert!(split_features_target(&df, "diagnosis", &[]).is_err());
}

#[test]
fn test_csv_with_missing_cell_rejected_at_split() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("patients.csv");
    std::fs::write(
        &path,
        "name,jitter,shimmer,status\n\
         p0,0.002,0.021,0\n\
         p1,0.003,,1\n\
         p2,0.004,0.023,1\n",
    )
    .unwrap();

    let df = parkinson_detect::data::DataLoader::load_csv(&path).unwrap();
    let result = split_features_target(&df, "status", &["name".to_string()]);

    let err = result.unwrap_err().to_string();
    assert!(
        err.contains("shimmer") && err.contains("row 1"),
        "missing cell should surface as a data error, got: {}",
        err
    );
}

#[test]
fn test_split_ignores_absent_drop_columns() {
    let df = sample_df();
    let drops = vec!["name".to_string(), "no_such_column".to_string()];
    let (_, _, manifest) = split_features_target(&df, "status", &drops).unwrap();
    assert_eq!(manifest.len(), 3);
}

// ============================================================================
// Stratified splitting
// ============================================================================

#[test]
fn test_stratified_split_preserves_class_presence() {
    let df = sample_df();
    let (x, y, _) = split_features_target(&df, "status", &["name".to_string()]).unwrap();

    let (x_train, x_test, y_train, y_test) = stratified_split(&x, &y, 0.25, 42).unwrap();

    assert_eq!(x_train.nrows() + x_test.nrows(), 20);
    assert_eq!(y_train.len(), x_train.nrows());
    assert_eq!(y_test.len(), x_test.nrows());

    let test_counts = class_counts(&y_test);
    assert!(test_counts.contains_key(&0), "negatives must reach the test set");
    assert!(test_counts.contains_key(&1), "positives must reach the test set");
}

#[test]
fn test_stratified_split_rejects_bad_fraction() {
    let df = sample_df();
    let (x, y, _) = split_features_target(&df, "status", &["name".to_string()]).unwrap();

    assert!(stratified_split(&x, &y, 0.0, 42).is_err());
    assert!(stratified_split(&x, &y, 1.0, 42).is_err());
    assert!(stratified_split(&x, &y, -0.2, 42).is_err());
}

#[test]
fn test_stratified_split_deterministic() {
    let df = sample_df();
    let (x, y, _) = split_features_target(&df, "status", &["name".to_string()]).unwrap();

    let (a_train, _, a_y, _) = stratified_split(&x, &y, 0.2, 7).unwrap();
    let (b_train, _, b_y, _) = stratified_split(&x, &y, 0.2, 7).unwrap();
    assert_eq!(a_train, b_train);
    assert_eq!(a_y, b_y);
}

// ============================================================================
// Scaling
// ============================================================================

#[test]
fn test_scaler_uses_training_statistics_only() {
    let df = sample_df();
    let (x, y, _) = split_features_target(&df, "status", &["name".to_string()]).unwrap();
    let (x_train, x_test, _, _) = stratified_split(&x, &y, 0.25, 42).unwrap();

    let mut scaler = Scaler::new(ScalerMethod::Standard);
    let scaled_train = scaler.fit_transform(&x_train).unwrap();
    let scaled_test = scaler.transform(&x_test).unwrap();

    // Training columns are centered; held-out columns generally are not.
    for col in scaled_train.columns() {
        let mean: f64 = col.iter().sum::<f64>() / col.len() as f64;
        assert!(mean.abs() < 1e-9, "train column mean should be ~0, got {}", mean);
    }
    assert_eq!(scaled_test.nrows(), x_test.nrows());

    // Round trip recovers the originals.
    let restored = scaler.inverse_transform(&scaled_train).unwrap();
    for (a, b) in restored.iter().zip(x_train.iter()) {
        assert!((a - b).abs() < 1e-10);
    }
}

// ============================================================================
// Full preparation
// ============================================================================

#[test]
fn test_prepare_data_defaults_balance_training_partition() {
    let df = sample_df();
    let config = PrepareConfig::default();
    let prepared = prepare_data(&df, &config).unwrap();

    assert_eq!(prepared.feature_names.len(), 3);
    assert!(prepared.scaler.is_some());

    // SMOTE raises the minority to the majority count, train side only.
    let train_counts = class_counts(&prepared.y_train);
    assert_eq!(train_counts[&0], train_counts[&1]);

    let test_counts = class_counts(&prepared.y_test);
    let total_test: usize = test_counts.values().sum();
    assert_eq!(total_test, prepared.x_test.nrows());
}

#[test]
fn test_prepare_data_without_scale_or_balance() {
    let df = sample_df();
    let config = PrepareConfig::new("status")
        .with_scale(None)
        .with_balance(None);
    let prepared = prepare_data(&df, &config).unwrap();

    assert!(prepared.scaler.is_none());
    assert_eq!(
        prepared.x_train.nrows() + prepared.x_test.nrows(),
        20,
        "without balancing no rows are added or removed"
    );
}

#[test]
fn test_prepare_data_undersample() {
    let df = sample_df();
    let config = PrepareConfig::new("status")
        .with_balance(Some(BalanceMethod::Undersample))
        .with_scale(None);
    let prepared = prepare_data(&df, &config).unwrap();

    let counts = class_counts(&prepared.y_train);
    assert_eq!(counts[&0], counts[&1]);
    let minority = counts.values().min().copied().unwrap();
    assert!(prepared.y_train.len() == 2 * minority);
}

#[test]
fn test_prepare_data_singleton_class_errors() {
    let df = df!(
        "jitter" => &[0.1, 0.2, 0.3, 0.4, 0.5],
        "shimmer" => &[1.0, 2.0, 3.0, 4.0, 5.0],
        "status" => &[0i64, 0, 0, 0, 1],
    )
    .unwrap();
    let config = PrepareConfig::new("status").with_drop_columns(vec![]);
    assert!(prepare_data(&df, &config).is_err());
}

#[test]
fn test_prepare_data_target_vector_untouched_by_scaling() {
    let df = sample_df();
    let config = PrepareConfig::new("status").with_balance(None);
    let prepared = prepare_data(&df, &config).unwrap();

    let all: Array1<i64> = prepared
        .y_train
        .iter()
        .chain(prepared.y_test.iter())
        .copied()
        .collect();
    assert!(all.iter().all(|&v| v == 0 || v == 1));
}
