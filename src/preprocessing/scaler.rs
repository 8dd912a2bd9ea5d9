//! Feature scaling
//!
//! Statistics are estimated from the training partition only and then
//! applied unchanged to test and inference data.

use std::str::FromStr;

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Supported scaling transforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalerMethod {
    /// Zero mean, unit variance
    Standard,
    /// Rescale each feature to [0, 1]
    MinMax,
}

impl FromStr for ScalerMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(ScalerMethod::Standard),
            "minmax" | "min-max" => Ok(ScalerMethod::MinMax),
            other => Err(PipelineError::Config(format!(
                "Unknown scaling method '{}' (expected 'standard' or 'minmax')",
                other
            ))),
        }
    }
}

/// Fitted statistics for one feature
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    center: f64,
    scale: f64,
}

/// Per-feature scaler over a manifest-ordered feature matrix.
///
/// Column `j` of every matrix passed to [`Scaler::transform`] must be the
/// same feature as column `j` seen at fit time; the feature manifest is
/// what guarantees this at inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    method: ScalerMethod,
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    pub fn new(method: ScalerMethod) -> Self {
        Self {
            method,
            params: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn method(&self) -> ScalerMethod {
        self.method
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Number of features the scaler was fitted on.
    pub fn n_features(&self) -> usize {
        self.params.len()
    }

    /// Estimate per-column statistics from `x`.
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(PipelineError::Preprocessing(
                "Cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        self.params = x
            .axis_iter(Axis(1))
            .map(|col| {
                let (center, spread) = match self.method {
                    ScalerMethod::Standard => {
                        let mean = col.mean().unwrap_or(0.0);
                        let std = col.std(0.0);
                        (mean, std)
                    }
                    ScalerMethod::MinMax => {
                        let min = col.iter().cloned().fold(f64::INFINITY, f64::min);
                        let max = col.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                        (min, max - min)
                    }
                };
                // Constant columns map to 0 instead of dividing by zero
                let scale = if spread.abs() < f64::EPSILON { 1.0 } else { spread };
                ScalerParams { center, scale }
            })
            .collect();

        self.is_fitted = true;
        Ok(())
    }

    /// Apply the fitted statistics to `x`.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }
        if x.ncols() != self.params.len() {
            return Err(PipelineError::Shape {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.clone();
        for (j, params) in self.params.iter().enumerate() {
            for value in out.column_mut(j).iter_mut() {
                *value = (*value - params.center) / params.scale;
            }
        }
        Ok(out)
    }

    /// Undo the transform.
    pub fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }
        if x.ncols() != self.params.len() {
            return Err(PipelineError::Shape {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.clone();
        for (j, params) in self.params.iter().enumerate() {
            for value in out.column_mut(j).iter_mut() {
                *value = *value * params.scale + params.center;
            }
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}
