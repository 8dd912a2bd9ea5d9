//! Gradient-boosted trees for binary classification
//!
//! Shallow regression trees are fitted to the logistic-loss gradient in
//! additive rounds, with optional row subsampling per round.

use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::training::classifier::{expand_binary_proba, validate_binary_labels, Classifier};
use crate::training::decision_tree::DecisionTree;
use crate::training::linear::sigmoid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    n_estimators: usize,
    learning_rate: f64,
    max_depth: usize,
    /// Fraction of rows drawn (without replacement) per boosting round
    subsample: f64,
    seed: u64,
    initial_log_odds: f64,
    trees: Vec<DecisionTree>,
}

impl GradientBoosting {
    pub fn new(seed: u64) -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            subsample: 1.0,
            seed,
            initial_log_odds: 0.0,
            trees: Vec::new(),
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    pub fn with_subsample(mut self, fraction: f64) -> Self {
        self.subsample = fraction.clamp(0.1, 1.0);
        self
    }

    fn log_odds(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }

        let mut log_odds = Array1::from_elem(x.nrows(), self.initial_log_odds);
        for tree in &self.trees {
            let contribution = tree.predict_values(x)?;
            log_odds += &(self.learning_rate * &contribution);
        }
        Ok(log_odds)
    }
}

impl Classifier for GradientBoosting {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        validate_binary_labels(y)?;

        let n_samples = x.nrows();
        let y_f64 = y.mapv(|v| v as f64);

        let p = y_f64.mean().unwrap_or(0.5).clamp(1e-10, 1.0 - 1e-10);
        self.initial_log_odds = (p / (1.0 - p)).ln();

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut log_odds = Array1::from_elem(n_samples, self.initial_log_odds);
        self.trees = Vec::with_capacity(self.n_estimators);

        for _ in 0..self.n_estimators {
            // Gradient of the log loss with respect to the log odds
            let residuals: Array1<f64> = y_f64
                .iter()
                .zip(log_odds.iter())
                .map(|(&yi, &lo)| yi - sigmoid(lo))
                .collect();

            let mut tree = DecisionTree::new().with_max_depth(self.max_depth);

            if self.subsample < 1.0 {
                let sample_size = ((n_samples as f64) * self.subsample).ceil() as usize;
                let mut indices: Vec<usize> = (0..n_samples).collect();
                indices.shuffle(&mut rng);
                indices.truncate(sample_size.max(2));
                indices.sort_unstable();

                let x_sub = x.select(Axis(0), &indices);
                let r_sub: Array1<f64> = indices.iter().map(|&i| residuals[i]).collect();
                tree.fit_values(&x_sub, &r_sub)?;
            } else {
                tree.fit_values(x, &residuals)?;
            }

            let contribution = tree.predict_values(x)?;
            log_odds += &(self.learning_rate * &contribution);
            self.trees.push(tree);
        }

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let log_odds = self.log_odds(x)?;
        Ok(log_odds.mapv(|lo| if sigmoid(lo) >= 0.5 { 1 } else { 0 }))
    }

    fn predict_probabilities(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        let positive = self.log_odds(x)?.mapv(sigmoid);
        Ok(Some(expand_binary_proba(&positive)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn banded_data() -> (Array2<f64>, Array1<i64>) {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| (i as f64) * 0.25 + (j as f64) * 0.1);
        let y: Array1<i64> = (0..40).map(|i| if i >= 20 { 1 } else { 0 }).collect();
        (x, y)
    }

    #[test]
    fn test_boosting_fits_banded_data() {
        let (x, y) = banded_data();
        let mut model = GradientBoosting::new(42).with_n_estimators(20);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(a, b)| a == b)
            .count();
        assert!(correct >= 38, "boosting got {}/40 right", correct);
    }

    #[test]
    fn test_probabilities_monotone_across_boundary() {
        let (x, y) = banded_data();
        let mut model = GradientBoosting::new(42).with_n_estimators(20);
        model.fit(&x, &y).unwrap();

        let proba = model
            .predict_probabilities(&array![[0.0, 0.0], [9.9, 10.0]])
            .unwrap()
            .unwrap();
        assert!(proba[[0, 1]] < 0.5);
        assert!(proba[[1, 1]] > 0.5);
    }

    #[test]
    fn test_subsampled_boosting_deterministic() {
        let (x, y) = banded_data();
        let probe = array![[2.0, 2.1], [8.0, 8.1]];

        let mut a = GradientBoosting::new(5).with_n_estimators(10).with_subsample(0.7);
        a.fit(&x, &y).unwrap();
        let mut b = GradientBoosting::new(5).with_n_estimators(10).with_subsample(0.7);
        b.fit(&x, &y).unwrap();

        assert_eq!(
            a.predict_probabilities(&probe).unwrap().unwrap(),
            b.predict_probabilities(&probe).unwrap().unwrap()
        );
    }

    #[test]
    fn test_unfitted_errors() {
        let model = GradientBoosting::new(42);
        assert!(model.predict(&array![[1.0, 2.0]]).is_err());
    }
}
