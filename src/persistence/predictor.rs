//! Inference over reconstructed artifacts
//!
//! Inputs arrive as a single field->value record, a table, or a raw matrix;
//! the feature manifest selects and reorders columns before the scaler and
//! model see them, which is what keeps training and serving schemas in
//! lockstep.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::{DataLoader, DataSaver};
use crate::error::{PipelineError, Result};
use crate::preprocessing::{columns_to_array2, Scaler};
use crate::training::{Classifier, FittedModel};

/// Human-readable names for the two classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassLabels {
    pub negative: String,
    pub positive: String,
}

impl Default for ClassLabels {
    fn default() -> Self {
        Self {
            negative: "Healthy".to_string(),
            positive: "Parkinson".to_string(),
        }
    }
}

impl ClassLabels {
    pub fn label_for(&self, class: i64) -> &str {
        if class == 1 {
            &self.positive
        } else {
            &self.negative
        }
    }
}

/// The three accepted input shapes for prediction.
pub enum PredictInput {
    /// One record as a field-name -> value mapping
    Record(BTreeMap<String, f64>),
    /// A table whose header must cover the manifest (extra columns ignored)
    Table(DataFrame),
    /// A raw matrix already in manifest column order
    Matrix(Array2<f64>),
}

/// Labels plus per-class probabilities when the model has them.
#[derive(Debug, Clone)]
pub struct BatchPrediction {
    pub labels: Array1<i64>,
    /// Columns `[P(negative), P(positive)]`; `None` for models without
    /// probability support
    pub probabilities: Option<Array2<f64>>,
}

fn matrix_from_input(input: &PredictInput, feature_names: &[String]) -> Result<Array2<f64>> {
    match input {
        PredictInput::Record(record) => {
            let mut row = Vec::with_capacity(feature_names.len());
            for name in feature_names {
                let value = record
                    .get(name)
                    .ok_or_else(|| PipelineError::FeatureNotFound(name.clone()))?;
                row.push(*value);
            }
            Ok(Array2::from_shape_vec((1, feature_names.len()), row)?)
        }
        PredictInput::Table(df) => columns_to_array2(df, feature_names),
        PredictInput::Matrix(matrix) => {
            if matrix.ncols() != feature_names.len() {
                return Err(PipelineError::Shape {
                    expected: format!("{} columns", feature_names.len()),
                    actual: format!("{} columns", matrix.ncols()),
                });
            }
            Ok(matrix.clone())
        }
    }
}

/// Reorder/select input columns by the manifest, scale if a scaler is
/// supplied, and predict.
pub fn predict(
    fitted: &FittedModel,
    input: &PredictInput,
    scaler: Option<&Scaler>,
    feature_names: &[String],
) -> Result<BatchPrediction> {
    let matrix = matrix_from_input(input, feature_names)?;

    let matrix = match scaler {
        Some(s) => s.transform(&matrix)?,
        None => matrix,
    };

    let labels = fitted.model.predict(&matrix)?;
    let probabilities = fitted.model.predict_probabilities(&matrix)?;

    Ok(BatchPrediction {
        labels,
        probabilities,
    })
}

/// Fixed result shape for exactly one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientPrediction {
    pub class: i64,
    pub label: String,
    pub probability_healthy: Option<f64>,
    pub probability_parkinson: Option<f64>,
}

/// Predict for one record and shape the result: integer class, readable
/// label, and the two class probabilities when available.
pub fn predict_single_patient(
    fitted: &FittedModel,
    record: &BTreeMap<String, f64>,
    scaler: Option<&Scaler>,
    feature_names: &[String],
    labels: &ClassLabels,
) -> Result<PatientPrediction> {
    let input = PredictInput::Record(record.clone());
    let batch = predict(fitted, &input, scaler, feature_names)?;

    let class = batch.labels[0];
    let (probability_healthy, probability_parkinson) = match &batch.probabilities {
        Some(proba) => (Some(proba[[0, 0]]), Some(proba[[0, 1]])),
        None => (None, None),
    };

    Ok(PatientPrediction {
        class,
        label: labels.label_for(class).to_string(),
        probability_healthy,
        probability_parkinson,
    })
}

/// Batch-predict a CSV file and write the table back augmented with
/// `prediction`, `prediction_label`, and per-class probability columns.
/// Without an explicit output path the result lands next to the input as
/// `<stem>_predictions.csv`. Returns the output path and row count.
pub fn predict_from_csv(
    fitted: &FittedModel,
    scaler: Option<&Scaler>,
    feature_names: &[String],
    input_path: impl AsRef<Path>,
    output_path: Option<&Path>,
    labels: &ClassLabels,
) -> Result<(PathBuf, usize)> {
    let input_path = input_path.as_ref();
    let mut df = DataLoader::load_csv(input_path)?;

    let batch = predict(
        fitted,
        &PredictInput::Table(df.clone()),
        scaler,
        feature_names,
    )?;
    let n_rows = batch.labels.len();

    let label_strings: Vec<String> = batch
        .labels
        .iter()
        .map(|&c| labels.label_for(c).to_string())
        .collect();

    df.with_column(Series::new("prediction".into(), batch.labels.to_vec()))?;
    df.with_column(Series::new("prediction_label".into(), label_strings))?;

    if let Some(proba) = &batch.probabilities {
        let healthy: Vec<f64> = proba.column(0).to_vec();
        let parkinson: Vec<f64> = proba.column(1).to_vec();
        df.with_column(Series::new("probability_healthy".into(), healthy))?;
        df.with_column(Series::new("probability_parkinson".into(), parkinson))?;
    }

    let output = match output_path {
        Some(path) => path.to_path_buf(),
        None => {
            let stem = input_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("input");
            input_path.with_file_name(format!("{}_predictions.csv", stem))
        }
    };

    DataSaver::save_csv(&mut df, &output)?;
    tracing::info!(rows = n_rows, path = %output.display(), "wrote predictions");
    Ok((output, n_rows))
}
