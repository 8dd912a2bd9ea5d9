//! Support vector machine trained with sequential minimal optimization
//!
//! Binary soft-margin SVM with linear or RBF kernels. The decision function
//! is uncalibrated, so this is the one registry member without probability
//! support: `predict_probabilities` returns `Ok(None)`.

use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::training::classifier::{validate_binary_labels, Classifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelType {
    Linear,
    Rbf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmClassifier {
    c: f64,
    kernel: KernelType,
    /// RBF width; resolved from the data at fit time when `None`
    gamma: Option<f64>,
    tol: f64,
    max_passes: usize,
    seed: u64,
    // Fitted state: support vectors with their alpha * y coefficients
    support_vectors: Option<Array2<f64>>,
    coefficients: Option<Array1<f64>>,
    bias: f64,
    fitted_gamma: f64,
}

impl SvmClassifier {
    pub fn new(seed: u64) -> Self {
        Self {
            c: 1.0,
            kernel: KernelType::Rbf,
            gamma: None,
            tol: 1e-3,
            max_passes: 5,
            seed,
            support_vectors: None,
            coefficients: None,
            bias: 0.0,
            fitted_gamma: 1.0,
        }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c.max(1e-6);
        self
    }

    pub fn with_kernel(mut self, kernel: KernelType) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = Some(gamma);
        self
    }

    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.as_ref().map_or(0, |sv| sv.nrows())
    }

    fn kernel_value(&self, a: &[f64], b: &[f64], gamma: f64) -> f64 {
        match self.kernel {
            KernelType::Linear => a.iter().zip(b.iter()).map(|(x, y)| x * y).sum(),
            KernelType::Rbf => {
                let sq_dist: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
                (-gamma * sq_dist).exp()
            }
        }
    }

    /// Signed distance to the separating surface.
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let sv = self
            .support_vectors
            .as_ref()
            .ok_or(PipelineError::ModelNotFitted)?;
        let coef = self
            .coefficients
            .as_ref()
            .ok_or(PipelineError::ModelNotFitted)?;

        if x.ncols() != sv.ncols() {
            return Err(PipelineError::Shape {
                expected: format!("{} features", sv.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let sv_rows: Vec<Vec<f64>> = sv
            .axis_iter(Axis(0))
            .map(|r| r.iter().copied().collect())
            .collect();

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let query: Vec<f64> = row.iter().copied().collect();
                let sum: f64 = sv_rows
                    .iter()
                    .zip(coef.iter())
                    .map(|(s, &a)| a * self.kernel_value(s, &query, self.fitted_gamma))
                    .sum();
                sum + self.bias
            })
            .collect())
    }
}

impl Classifier for SvmClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        validate_binary_labels(y)?;
        let n = x.nrows();

        // Labels as -1 / +1 for the margin formulation
        let y_signed: Vec<f64> = y.iter().map(|&v| if v == 1 { 1.0 } else { -1.0 }).collect();

        // gamma = 1 / (n_features * Var(x)), the usual "scale" heuristic
        let gamma = match self.gamma {
            Some(g) => g,
            None => {
                let var = x.var(0.0);
                let denom = x.ncols() as f64 * if var > 1e-12 { var } else { 1.0 };
                1.0 / denom
            }
        };
        self.fitted_gamma = gamma;

        let rows: Vec<Vec<f64>> = x
            .axis_iter(Axis(0))
            .map(|r| r.iter().copied().collect())
            .collect();

        // Dense kernel matrix; training sets here are small
        let mut kernel = vec![vec![0.0f64; n]; n];
        for i in 0..n {
            for j in i..n {
                let v = self.kernel_value(&rows[i], &rows[j], gamma);
                kernel[i][j] = v;
                kernel[j][i] = v;
            }
        }

        let mut alphas = vec![0.0f64; n];
        let mut b = 0.0f64;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let f = |alphas: &[f64], b: f64, idx: usize, kernel: &[Vec<f64>]| -> f64 {
            alphas
                .iter()
                .zip(y_signed.iter())
                .zip(kernel[idx].iter())
                .map(|((&a, &ys), &k)| a * ys * k)
                .sum::<f64>()
                + b
        };

        let mut passes = 0;
        let mut iterations = 0;
        while passes < self.max_passes && iterations < 1000 {
            iterations += 1;
            let mut num_changed = 0;

            for i in 0..n {
                let e_i = f(&alphas, b, i, &kernel) - y_signed[i];

                let violates = (y_signed[i] * e_i < -self.tol && alphas[i] < self.c)
                    || (y_signed[i] * e_i > self.tol && alphas[i] > 0.0);
                if !violates {
                    continue;
                }

                let mut j = rng.gen_range(0..n - 1);
                if j >= i {
                    j += 1;
                }
                let e_j = f(&alphas, b, j, &kernel) - y_signed[j];

                let (alpha_i_old, alpha_j_old) = (alphas[i], alphas[j]);
                let (low, high) = if (y_signed[i] - y_signed[j]).abs() > f64::EPSILON {
                    let diff = alphas[j] - alphas[i];
                    (diff.max(0.0), (self.c + diff).min(self.c))
                } else {
                    let sum = alphas[i] + alphas[j];
                    ((sum - self.c).max(0.0), sum.min(self.c))
                };
                if (high - low).abs() < f64::EPSILON {
                    continue;
                }

                let eta = 2.0 * kernel[i][j] - kernel[i][i] - kernel[j][j];
                if eta >= 0.0 {
                    continue;
                }

                alphas[j] = (alpha_j_old - y_signed[j] * (e_i - e_j) / eta).clamp(low, high);
                if (alphas[j] - alpha_j_old).abs() < 1e-5 {
                    continue;
                }

                alphas[i] = alpha_i_old + y_signed[i] * y_signed[j] * (alpha_j_old - alphas[j]);

                let b1 = b
                    - e_i
                    - y_signed[i] * (alphas[i] - alpha_i_old) * kernel[i][i]
                    - y_signed[j] * (alphas[j] - alpha_j_old) * kernel[i][j];
                let b2 = b
                    - e_j
                    - y_signed[i] * (alphas[i] - alpha_i_old) * kernel[i][j]
                    - y_signed[j] * (alphas[j] - alpha_j_old) * kernel[j][j];

                b = if alphas[i] > 0.0 && alphas[i] < self.c {
                    b1
                } else if alphas[j] > 0.0 && alphas[j] < self.c {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };

                num_changed += 1;
            }

            if num_changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
        }

        // Keep only rows with nonzero alpha
        let support_idx: Vec<usize> = (0..n).filter(|&i| alphas[i] > 1e-8).collect();
        if support_idx.is_empty() {
            return Err(PipelineError::Training(
                "SMO converged with no support vectors".to_string(),
            ));
        }

        self.support_vectors = Some(x.select(Axis(0), &support_idx));
        self.coefficients = Some(
            support_idx
                .iter()
                .map(|&i| alphas[i] * y_signed[i])
                .collect(),
        );
        self.bias = b;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let decisions = self.decision_function(x)?;
        Ok(decisions.mapv(|d| if d >= 0.0 { 1 } else { 0 }))
    }

    fn predict_probabilities(&self, _x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        if self.support_vectors.is_none() {
            return Err(PipelineError::ModelNotFitted);
        }
        // Uncalibrated margins are not probabilities
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn cluster_data() -> (Array2<f64>, Array1<i64>) {
        let x = array![
            [0.0, 0.0],
            [0.3, 0.1],
            [0.1, 0.3],
            [0.2, 0.2],
            [0.0, 0.4],
            [4.0, 4.0],
            [4.3, 4.1],
            [4.1, 4.3],
            [4.2, 4.2],
            [4.0, 4.4],
        ];
        let y = array![0i64, 0, 0, 0, 0, 1, 1, 1, 1, 1];
        (x, y)
    }

    #[test]
    fn test_rbf_svm_separates_clusters() {
        let (x, y) = cluster_data();
        let mut svm = SvmClassifier::new(42);
        svm.fit(&x, &y).unwrap();

        assert!(svm.n_support_vectors() > 0);
        let predictions = svm.predict(&x).unwrap();
        assert_eq!(predictions, y);
    }

    #[test]
    fn test_linear_kernel() {
        let (x, y) = cluster_data();
        let mut svm = SvmClassifier::new(42).with_kernel(KernelType::Linear);
        svm.fit(&x, &y).unwrap();

        let predictions = svm.predict(&array![[0.1, 0.1], [4.1, 4.1]]).unwrap();
        assert_eq!(predictions, array![0i64, 1]);
    }

    #[test]
    fn test_no_probability_support() {
        let (x, y) = cluster_data();
        let mut svm = SvmClassifier::new(42);
        svm.fit(&x, &y).unwrap();

        let proba = svm.predict_probabilities(&x).unwrap();
        assert!(proba.is_none());
    }

    #[test]
    fn test_decision_function_signs_match_predictions() {
        let (x, y) = cluster_data();
        let mut svm = SvmClassifier::new(42);
        svm.fit(&x, &y).unwrap();

        let decisions = svm.decision_function(&x).unwrap();
        let predictions = svm.predict(&x).unwrap();
        for (d, p) in decisions.iter().zip(predictions.iter()) {
            assert_eq!(*p == 1, *d >= 0.0);
        }
    }

    #[test]
    fn test_unfitted_errors() {
        let svm = SvmClassifier::new(42);
        assert!(svm.predict(&array![[1.0, 2.0]]).is_err());
        assert!(svm.predict_probabilities(&array![[1.0, 2.0]]).is_err());
    }
}
