//! Artifact persistence: fitted models, the scaler, and the feature manifest
//!
//! A training run writes one JSON file per model (lower-cased name, spaces
//! to underscores) and `feature_names.json` into one directory, plus
//! `scaler.json` when the run scaled its features. The model and manifest
//! are mandatory on load; a corrupt file is always an error, never a
//! half-initialized artifact.

pub mod predictor;

pub use predictor::{
    predict, predict_from_csv, predict_single_patient, BatchPrediction, ClassLabels,
    PatientPrediction, PredictInput,
};

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::preprocessing::Scaler;
use crate::training::FittedModel;

pub const SCALER_FILE: &str = "scaler.json";
pub const MANIFEST_FILE: &str = "feature_names.json";

/// Artifact file name for a model: lower-cased, spaces to underscores.
pub fn model_file_name(model_name: &str) -> String {
    format!("{}.json", model_name.to_lowercase().replace(' ', "_"))
}

/// Serialize one fitted model into `dir`, returning the written path.
pub fn save_model(fitted: &FittedModel, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let path = dir.join(model_file_name(&fitted.name));
    let json = serde_json::to_string_pretty(fitted)?;
    fs::write(&path, json)?;

    tracing::info!(model = %fitted.name, path = %path.display(), "saved model");
    Ok(path)
}

/// Reconstruct a fitted model from disk. Behaviorally identical to the
/// in-memory original: same trees, same coefficients.
pub fn load_model(path: impl AsRef<Path>) -> Result<FittedModel> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|e| {
        PipelineError::Artifact(format!("Cannot read model file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&json).map_err(|e| {
        PipelineError::Artifact(format!("Corrupt model file {}: {}", path.display(), e))
    })
}

/// Persist the ordered feature manifest, plus the fitted scaler when the
/// run used one. The manifest is always written; the scaler is an optional
/// co-located artifact.
pub fn save_preprocessing_params(
    scaler: Option<&Scaler>,
    feature_names: &[String],
    dir: impl AsRef<Path>,
) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    if let Some(scaler) = scaler {
        fs::write(dir.join(SCALER_FILE), serde_json::to_string_pretty(scaler)?)?;
    }
    fs::write(
        dir.join(MANIFEST_FILE),
        serde_json::to_string_pretty(&feature_names)?,
    )?;
    Ok(())
}

/// Load the manifest, and the scaler when one was persisted. A missing
/// manifest is an error; a missing scaler means the run was unscaled.
pub fn load_preprocessing_params(dir: impl AsRef<Path>) -> Result<(Option<Scaler>, Vec<String>)> {
    let dir = dir.as_ref();

    let manifest_json = fs::read_to_string(dir.join(MANIFEST_FILE)).map_err(|e| {
        PipelineError::Artifact(format!(
            "Cannot read {} in {}: {}",
            MANIFEST_FILE,
            dir.display(),
            e
        ))
    })?;
    let feature_names: Vec<String> = serde_json::from_str(&manifest_json)
        .map_err(|e| PipelineError::Artifact(format!("Corrupt {}: {}", MANIFEST_FILE, e)))?;

    let scaler_path = dir.join(SCALER_FILE);
    let scaler = if scaler_path.exists() {
        let scaler_json = fs::read_to_string(&scaler_path).map_err(|e| {
            PipelineError::Artifact(format!(
                "Cannot read {} in {}: {}",
                SCALER_FILE,
                dir.display(),
                e
            ))
        })?;
        Some(
            serde_json::from_str(&scaler_json)
                .map_err(|e| PipelineError::Artifact(format!("Corrupt {}: {}", SCALER_FILE, e)))?,
        )
    } else {
        None
    };

    Ok((scaler, feature_names))
}

/// First model artifact in `dir`, skipping the scaler, manifest, and report
/// files. Deterministic: candidates are sorted by file name.
pub fn find_model_file(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let reserved = [SCALER_FILE, MANIFEST_FILE, "evaluation_report.json"];

    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| PipelineError::Artifact(format!("Cannot list {}: {}", dir.display(), e)))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension().is_some_and(|ext| ext == "json")
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !reserved.contains(&n))
        })
        .collect();
    candidates.sort();

    candidates.into_iter().next().ok_or_else(|| {
        PipelineError::Artifact(format!("No model artifact found in {}", dir.display()))
    })
}
