//! Gaussian naive Bayes

use std::f64::consts::PI;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::training::classifier::{validate_binary_labels, Classifier};

/// Per-class Gaussian statistics over each feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClassStats {
    means: Array1<f64>,
    variances: Array1<f64>,
    prior: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    /// Added to every variance to keep the densities finite
    var_smoothing: f64,
    /// Statistics for classes 0 and 1, in that order
    stats: Option<[ClassStats; 2]>,
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianNaiveBayes {
    pub fn new() -> Self {
        Self {
            var_smoothing: 1e-9,
            stats: None,
        }
    }

    pub fn with_var_smoothing(mut self, smoothing: f64) -> Self {
        self.var_smoothing = smoothing;
        self
    }

    /// Welford's single-pass mean/variance over the rows of one class.
    fn class_stats(x: &Array2<f64>, rows: &[usize], prior: f64, smoothing: f64) -> ClassStats {
        let n_features = x.ncols();
        let mut means = Array1::<f64>::zeros(n_features);
        let mut m2 = Array1::<f64>::zeros(n_features);

        for (count, &i) in rows.iter().enumerate() {
            let n = (count + 1) as f64;
            for j in 0..n_features {
                let value = x[[i, j]];
                let delta = value - means[j];
                means[j] += delta / n;
                m2[j] += delta * (value - means[j]);
            }
        }

        let n = rows.len() as f64;
        let variances = m2.mapv(|v| v / n + smoothing);

        ClassStats {
            means,
            variances,
            prior,
        }
    }

    /// Joint log likelihood per class, normalized with log-sum-exp.
    fn log_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let stats = self.stats.as_ref().ok_or(PipelineError::ModelNotFitted)?;

        if x.ncols() != stats[0].means.len() {
            return Err(PipelineError::Shape {
                expected: format!("{} features", stats[0].means.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut out = Array2::<f64>::zeros((x.nrows(), 2));
        for (i, row) in x.rows().into_iter().enumerate() {
            let mut joint = [0.0f64; 2];
            for (c, class) in stats.iter().enumerate() {
                let mut log_lik = class.prior.ln();
                for (j, &value) in row.iter().enumerate() {
                    let var = class.variances[j];
                    let diff = value - class.means[j];
                    log_lik += -0.5 * ((2.0 * PI * var).ln() + diff * diff / var);
                }
                joint[c] = log_lik;
            }

            let max = joint[0].max(joint[1]);
            let log_norm = max + ((joint[0] - max).exp() + (joint[1] - max).exp()).ln();
            out[[i, 0]] = joint[0] - log_norm;
            out[[i, 1]] = joint[1] - log_norm;
        }
        Ok(out)
    }
}

impl Classifier for GaussianNaiveBayes {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        validate_binary_labels(y)?;
        if x.nrows() != y.len() {
            return Err(PipelineError::Shape {
                expected: format!("{} rows", y.len()),
                actual: format!("{} rows", x.nrows()),
            });
        }

        let n = y.len() as f64;
        let rows_0: Vec<usize> = y
            .iter()
            .enumerate()
            .filter_map(|(i, &l)| (l == 0).then_some(i))
            .collect();
        let rows_1: Vec<usize> = y
            .iter()
            .enumerate()
            .filter_map(|(i, &l)| (l == 1).then_some(i))
            .collect();

        self.stats = Some([
            Self::class_stats(x, &rows_0, rows_0.len() as f64 / n, self.var_smoothing),
            Self::class_stats(x, &rows_1, rows_1.len() as f64 / n, self.var_smoothing),
        ]);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let log_proba = self.log_proba(x)?;
        Ok(log_proba
            .rows()
            .into_iter()
            .map(|row| if row[1] > row[0] { 1 } else { 0 })
            .collect())
    }

    fn predict_probabilities(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        let log_proba = self.log_proba(x)?;
        Ok(Some(log_proba.mapv(f64::exp)))
    }
}
