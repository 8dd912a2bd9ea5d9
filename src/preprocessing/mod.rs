//! Data preprocessing: feature/target split, stratified partitioning,
//! scaling, and class balancing
//!
//! [`prepare_data`] is the orchestrator: it takes a loaded table plus an
//! explicit [`PrepareConfig`] and returns a [`PreparedData`] bundle holding
//! the four partitions, the feature manifest, and the fitted scaler. Nothing
//! here keeps hidden state between runs.

pub mod scaler;

pub use scaler::{Scaler, ScalerMethod};

use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{PipelineError, Result};
use crate::resampling::{class_indices, BalanceMethod};

/// Extract named columns from a DataFrame into a row-major `Array2<f64>`.
///
/// Every cell must hold a numeric value: a null or a cell the cast cannot
/// parse is a data error naming the column and row, never a silent zero.
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            let series = df
                .column(col_name)
                .map_err(|_| PipelineError::FeatureNotFound(col_name.clone()))?
                .as_materialized_series();
            let series_f64 = series
                .cast(&DataType::Float64)
                .map_err(|e| PipelineError::Data(e.to_string()))?;
            let chunked = series_f64
                .f64()
                .map_err(|e| PipelineError::Data(e.to_string()))?;
            if let Some(row) = chunked.into_iter().position(|v| v.is_none()) {
                return Err(PipelineError::Data(format!(
                    "Column '{}' has a missing or non-numeric value at row {}",
                    col_name, row
                )));
            }
            Ok(chunked.into_iter().flatten().collect())
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]))
}

/// Split a table into a feature matrix, an integer target vector, and the
/// feature manifest (remaining column names, source order preserved).
///
/// Drop columns that do not exist are ignored; a missing target column is
/// an error.
pub fn split_features_target(
    df: &DataFrame,
    target_column: &str,
    drop_columns: &[String],
) -> Result<(Array2<f64>, Array1<i64>, Vec<String>)> {
    let target_series = df
        .column(target_column)
        .map_err(|_| PipelineError::FeatureNotFound(target_column.to_string()))?
        .as_materialized_series();

    let feature_names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .filter(|name| name != target_column && !drop_columns.contains(name))
        .collect();

    if feature_names.is_empty() {
        return Err(PipelineError::Preprocessing(
            "No feature columns remain after dropping".to_string(),
        ));
    }

    let target_i64 = target_series
        .cast(&DataType::Int64)
        .map_err(|e| PipelineError::Data(format!("Target column is not numeric: {}", e)))?;
    let target_chunked = target_i64
        .i64()
        .map_err(|e| PipelineError::Data(e.to_string()))?;
    if let Some(row) = target_chunked.into_iter().position(|v| v.is_none()) {
        return Err(PipelineError::Data(format!(
            "Target column '{}' has a missing or non-numeric value at row {}",
            target_column, row
        )));
    }
    let y: Array1<i64> = target_chunked.into_iter().flatten().collect();

    let x = columns_to_array2(df, &feature_names)?;

    Ok((x, y, feature_names))
}

/// Stratified train/test split: each class contributes `test_fraction` of
/// its rows (rounded, at least 1, never all) to the test partition.
pub fn stratified_split(
    x: &Array2<f64>,
    y: &Array1<i64>,
    test_fraction: f64,
    seed: u64,
) -> Result<(Array2<f64>, Array2<f64>, Array1<i64>, Array1<i64>)> {
    if !(0.0..1.0).contains(&test_fraction) || test_fraction <= 0.0 {
        return Err(PipelineError::InvalidParameter {
            name: "test_fraction".to_string(),
            value: test_fraction.to_string(),
            reason: "must lie in (0, 1)".to_string(),
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_idx: Vec<usize> = Vec::new();
    let mut test_idx: Vec<usize> = Vec::new();

    for (class, indices) in class_indices(y) {
        if indices.len() < 2 {
            return Err(PipelineError::Preprocessing(format!(
                "Class {} has only {} member(s); too few to stratify",
                class,
                indices.len()
            )));
        }

        let mut shuffled = indices;
        shuffled.shuffle(&mut rng);

        let n_test = ((shuffled.len() as f64) * test_fraction)
            .round()
            .max(1.0) as usize;
        let n_test = n_test.min(shuffled.len() - 1);

        test_idx.extend_from_slice(&shuffled[..n_test]);
        train_idx.extend_from_slice(&shuffled[n_test..]);
    }

    // Restore source order within each partition
    train_idx.sort_unstable();
    test_idx.sort_unstable();

    let x_train = x.select(Axis(0), &train_idx);
    let x_test = x.select(Axis(0), &test_idx);
    let y_train: Array1<i64> = train_idx.iter().map(|&i| y[i]).collect();
    let y_test: Array1<i64> = test_idx.iter().map(|&i| y[i]).collect();

    Ok((x_train, x_test, y_train, y_test))
}

/// Fit the named scaler on the training partition only and apply it to both
/// partitions.
pub fn scale_data(
    x_train: &Array2<f64>,
    x_test: &Array2<f64>,
    method: ScalerMethod,
) -> Result<(Array2<f64>, Array2<f64>, Scaler)> {
    let mut scaler = Scaler::new(method);
    let scaled_train = scaler.fit_transform(x_train)?;
    let scaled_test = scaler.transform(x_test)?;
    Ok((scaled_train, scaled_test, scaler))
}

/// Rebalance class counts in the training partition only.
pub fn handle_imbalanced_data(
    x_train: &Array2<f64>,
    y_train: &Array1<i64>,
    method: BalanceMethod,
    seed: u64,
) -> Result<(Array2<f64>, Array1<i64>)> {
    let mut sampler = method.build(seed);
    let result = sampler.fit_resample(x_train, y_train)?;
    Ok((result.x, result.y))
}

/// Everything `prepare_data` needs, spelled out.
#[derive(Debug, Clone)]
pub struct PrepareConfig {
    pub target_column: String,
    pub drop_columns: Vec<String>,
    pub test_fraction: f64,
    pub seed: u64,
    /// `None` skips scaling
    pub scale: Option<ScalerMethod>,
    /// `None` skips balancing
    pub balance: Option<BalanceMethod>,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            target_column: "status".to_string(),
            drop_columns: vec!["name".to_string()],
            test_fraction: 0.2,
            seed: 42,
            scale: Some(ScalerMethod::Standard),
            balance: Some(BalanceMethod::Smote),
        }
    }
}

impl PrepareConfig {
    pub fn new(target_column: impl Into<String>) -> Self {
        Self {
            target_column: target_column.into(),
            ..Default::default()
        }
    }

    pub fn with_drop_columns(mut self, cols: Vec<String>) -> Self {
        self.drop_columns = cols;
        self
    }

    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_scale(mut self, scale: Option<ScalerMethod>) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_balance(mut self, balance: Option<BalanceMethod>) -> Self {
        self.balance = balance;
        self
    }
}

/// Output of [`prepare_data`]: partitions, manifest, fitted scaler.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<i64>,
    pub y_test: Array1<i64>,
    pub feature_names: Vec<String>,
    pub scaler: Option<Scaler>,
}

/// Full preprocessing pass: feature/target split, stratified train/test
/// split, optional scaling (train statistics only), optional balancing
/// (training partition only).
pub fn prepare_data(df: &DataFrame, config: &PrepareConfig) -> Result<PreparedData> {
    let (x, y, feature_names) =
        split_features_target(df, &config.target_column, &config.drop_columns)?;

    let (x_train, x_test, y_train, y_test) =
        stratified_split(&x, &y, config.test_fraction, config.seed)?;

    let (x_train, x_test, scaler) = match config.scale {
        Some(method) => {
            let (train, test, scaler) = scale_data(&x_train, &x_test, method)?;
            (train, test, Some(scaler))
        }
        None => (x_train, x_test, None),
    };

    let (x_train, y_train) = match config.balance {
        Some(method) => handle_imbalanced_data(&x_train, &y_train, method, config.seed)?,
        None => (x_train, y_train),
    };

    tracing::info!(
        train_rows = x_train.nrows(),
        test_rows = x_test.nrows(),
        features = feature_names.len(),
        "prepared data"
    );

    Ok(PreparedData {
        x_train,
        x_test,
        y_train,
        y_test,
        feature_names,
        scaler,
    })
}
