//! Logistic regression trained by batch gradient descent with L2 shrinkage

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::training::classifier::{expand_binary_proba, validate_binary_labels, Classifier};

pub(crate) fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    coefficients: Option<Array1<f64>>,
    intercept: f64,
    /// L2 regularization strength
    l2: f64,
    learning_rate: f64,
    max_iter: usize,
    tol: f64,
    is_fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            l2: 0.01,
            learning_rate: 0.1,
            max_iter: 1000,
            tol: 1e-6,
            is_fitted: false,
        }
    }

    pub fn with_l2(mut self, l2: f64) -> Self {
        self.l2 = l2;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    fn decision(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coef = self
            .coefficients
            .as_ref()
            .ok_or(PipelineError::ModelNotFitted)?;
        if x.ncols() != coef.len() {
            return Err(PipelineError::Shape {
                expected: format!("{} features", coef.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(coef) + self.intercept)
    }

    /// Positive-class probability per row.
    fn positive_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision(x)?.mapv(sigmoid))
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        validate_binary_labels(y)?;
        if x.nrows() != y.len() {
            return Err(PipelineError::Shape {
                expected: format!("{} rows", y.len()),
                actual: format!("{} rows", x.nrows()),
            });
        }

        let n_samples = x.nrows() as f64;
        let n_features = x.ncols();
        let y_f64: Array1<f64> = y.mapv(|v| v as f64);

        let mut coef = Array1::<f64>::zeros(n_features);
        let mut intercept = 0.0;

        for _ in 0..self.max_iter {
            let z = x.dot(&coef) + intercept;
            let p = z.mapv(sigmoid);
            let residual = &p - &y_f64;

            let grad_coef = x.t().dot(&residual) / n_samples + self.l2 * &coef;
            let grad_intercept = residual.sum() / n_samples;

            coef -= &(self.learning_rate * &grad_coef);
            intercept -= self.learning_rate * grad_intercept;

            let grad_norm = grad_coef.mapv(|g| g * g).sum().sqrt();
            if grad_norm < self.tol {
                break;
            }
        }

        self.coefficients = Some(coef);
        self.intercept = intercept;
        self.is_fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let proba = self.positive_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1 } else { 0 }))
    }

    fn predict_probabilities(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        let positive = self.positive_proba(x)?;
        Ok(Some(expand_binary_proba(&positive)))
    }
}
