//! Random forest of bootstrapped decision trees

use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::training::classifier::{expand_binary_proba, validate_binary_labels, Classifier};
use crate::training::decision_tree::DecisionTree;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    n_estimators: usize,
    max_depth: usize,
    seed: u64,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(seed: u64) -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            seed,
            trees: Vec::new(),
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Fraction of trees voting for class 1, per row.
    fn vote_fraction(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }

        let mut votes = Array1::<f64>::zeros(x.nrows());
        for tree in &self.trees {
            let values = tree.predict_values(x)?;
            for (acc, v) in votes.iter_mut().zip(values.iter()) {
                if *v >= 0.5 {
                    *acc += 1.0;
                }
            }
        }
        Ok(votes / self.trees.len() as f64)
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        validate_binary_labels(y)?;
        let n = x.nrows();
        let y_f64 = y.mapv(|v| v as f64);
        let base_seed = self.seed;
        let max_depth = self.max_depth;

        self.trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                // Per-tree generator so fitting order does not matter
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));
                let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

                let x_boot = x.select(Axis(0), &indices);
                let y_boot: Array1<f64> = indices.iter().map(|&i| y_f64[i]).collect();

                let mut tree = DecisionTree::new().with_max_depth(max_depth);
                tree.fit_values(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let fractions = self.vote_fraction(x)?;
        Ok(fractions.mapv(|f| if f >= 0.5 { 1 } else { 0 }))
    }

    fn predict_probabilities(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        let fractions = self.vote_fraction(x)?;
        Ok(Some(expand_binary_proba(&fractions)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn cluster_data() -> (Array2<f64>, Array1<i64>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..15 {
            rows.push([(i % 4) as f64 * 0.2, (i % 3) as f64 * 0.2]);
            labels.push(0i64);
        }
        for i in 0..15 {
            rows.push([4.0 + (i % 4) as f64 * 0.2, 4.0 + (i % 3) as f64 * 0.2]);
            labels.push(1i64);
        }
        let x = Array2::from_shape_fn((30, 2), |(i, j)| rows[i][j]);
        (x, Array1::from_vec(labels))
    }

    #[test]
    fn test_forest_classifies_clusters() {
        let (x, y) = cluster_data();
        let mut forest = RandomForest::new(42).with_n_estimators(20);
        forest.fit(&x, &y).unwrap();

        assert_eq!(forest.n_trees(), 20);
        let predictions = forest.predict(&x).unwrap();
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(a, b)| a == b)
            .count();
        assert!(correct >= 28, "forest got {}/30 right", correct);
    }

    #[test]
    fn test_forest_deterministic_for_seed() {
        let (x, y) = cluster_data();
        let probe = array![[0.1, 0.1], [4.2, 4.2]];

        let mut a = RandomForest::new(7).with_n_estimators(10);
        a.fit(&x, &y).unwrap();
        let mut b = RandomForest::new(7).with_n_estimators(10);
        b.fit(&x, &y).unwrap();

        assert_eq!(
            a.predict_probabilities(&probe).unwrap().unwrap(),
            b.predict_probabilities(&probe).unwrap().unwrap()
        );
    }

    #[test]
    fn test_forest_probabilities_confident_on_clusters() {
        let (x, y) = cluster_data();
        let mut forest = RandomForest::new(42).with_n_estimators(20);
        forest.fit(&x, &y).unwrap();

        let proba = forest
            .predict_probabilities(&array![[0.0, 0.0], [4.4, 4.4]])
            .unwrap()
            .unwrap();
        assert!(proba[[0, 0]] > 0.8);
        assert!(proba[[1, 1]] > 0.8);
    }

    #[test]
    fn test_unfitted_forest_errors() {
        let forest = RandomForest::new(42);
        assert!(forest.predict(&array![[1.0, 2.0]]).is_err());
    }
}
