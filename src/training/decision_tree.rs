//! Binary decision tree
//!
//! Leaves hold the mean target of their samples. On 0/1 labels that mean is
//! the positive-class fraction and minimizing within-leaf variance picks the
//! same splits as Gini impurity, so the one tree serves both the classifier
//! registry and the gradient-boosting residual fits.

use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::training::classifier::{expand_binary_proba, validate_binary_labels, Classifier};

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// Candidate split scored by summed squared error of the two children.
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    score: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    max_depth: usize,
    min_samples_split: usize,
    min_samples_leaf: usize,
    root: Option<TreeNode>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            root: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    pub fn with_min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n.max(1);
        self
    }

    /// Fit against arbitrary real-valued targets (used directly by the
    /// gradient booster; the `Classifier` impl feeds 0/1 labels through it).
    pub(crate) fn fit_values(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(PipelineError::Shape {
                expected: format!("{} rows", y.len()),
                actual: format!("{} rows", x.nrows()),
            });
        }
        if x.nrows() == 0 {
            return Err(PipelineError::Training(
                "Cannot fit a tree on zero samples".to_string(),
            ));
        }

        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.root = Some(self.build(x, y, indices, 0));
        Ok(())
    }

    /// Mean-target leaf outputs per row.
    pub(crate) fn predict_values(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let values: Vec<f64> = row.iter().copied().collect();
                Self::predict_row(root, &values)
            })
            .collect())
    }

    fn predict_row(node: &TreeNode, row: &[f64]) -> f64 {
        match node {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
            } => {
                if row[*feature_idx] <= *threshold {
                    Self::predict_row(left, row)
                } else {
                    Self::predict_row(right, row)
                }
            }
        }
    }

    fn build(&self, x: &Array2<f64>, y: &Array1<f64>, indices: Vec<usize>, depth: usize) -> TreeNode {
        let n = indices.len();
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / n as f64;

        let sse: f64 = indices.iter().map(|&i| (y[i] - mean).powi(2)).sum();
        if depth >= self.max_depth || n < self.min_samples_split || sse < 1e-12 {
            return TreeNode::Leaf {
                value: mean,
                n_samples: n,
            };
        }

        match self.find_best_split(x, y, &indices) {
            Some(split) if split.score < sse => TreeNode::Split {
                feature_idx: split.feature_idx,
                threshold: split.threshold,
                left: Box::new(self.build(x, y, split.left, depth + 1)),
                right: Box::new(self.build(x, y, split.right, depth + 1)),
            },
            _ => TreeNode::Leaf {
                value: mean,
                n_samples: n,
            },
        }
    }

    /// Scan every feature in parallel; for each, sort the rows and sweep
    /// midpoint thresholds with running sums.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
    ) -> Option<SplitCandidate> {
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();

        (0..x.ncols())
            .into_par_iter()
            .filter_map(|feature_idx| {
                let mut sorted: Vec<usize> = indices.to_vec();
                sorted.sort_by(|&a, &b| {
                    x[[a, feature_idx]]
                        .partial_cmp(&x[[b, feature_idx]])
                        .unwrap_or(std::cmp::Ordering::Equal)
                });

                let mut best: Option<(f64, f64, usize)> = None; // (score, threshold, split_pos)
                let mut left_sum = 0.0;
                let mut left_sq = 0.0;

                for pos in 0..n - 1 {
                    let i = sorted[pos];
                    left_sum += y[i];
                    left_sq += y[i] * y[i];

                    let n_left = pos + 1;
                    let n_right = n - n_left;
                    if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                        continue;
                    }

                    let v_here = x[[i, feature_idx]];
                    let v_next = x[[sorted[pos + 1], feature_idx]];
                    if v_next <= v_here {
                        continue; // no threshold separates equal values
                    }

                    let right_sum = total_sum - left_sum;
                    let right_sq = total_sq - left_sq;
                    let sse_left = left_sq - left_sum * left_sum / n_left as f64;
                    let sse_right = right_sq - right_sum * right_sum / n_right as f64;
                    let score = sse_left + sse_right;

                    if best.map_or(true, |(s, _, _)| score < s) {
                        best = Some((score, (v_here + v_next) / 2.0, pos));
                    }
                }

                best.map(|(score, threshold, pos)| SplitCandidate {
                    feature_idx,
                    threshold,
                    score,
                    left: sorted[..=pos].to_vec(),
                    right: sorted[pos + 1..].to_vec(),
                })
            })
            .min_by(|a, b| {
                a.score
                    .partial_cmp(&b.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    // equal scores resolve to the lower feature index
                    .then(a.feature_idx.cmp(&b.feature_idx))
            })
    }

    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }
}

impl Classifier for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        validate_binary_labels(y)?;
        let y_f64 = y.mapv(|v| v as f64);
        self.fit_values(x, &y_f64)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let values = self.predict_values(x)?;
        Ok(values.mapv(|v| if v >= 0.5 { 1 } else { 0 }))
    }

    fn predict_probabilities(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        let positive = self.predict_values(x)?.mapv(|v| v.clamp(0.0, 1.0));
        Ok(Some(expand_binary_proba(&positive)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn xor_free_data() -> (Array2<f64>, Array1<i64>) {
        // Separable on the first feature at ~1.5
        let x = array![
            [1.0, 5.0],
            [1.2, 1.0],
            [0.8, 3.0],
            [1.1, 4.0],
            [2.0, 2.0],
            [2.3, 5.0],
            [1.9, 1.0],
            [2.1, 3.0],
        ];
        let y = array![0i64, 0, 0, 0, 1, 1, 1, 1];
        (x, y)
    }

    #[test]
    fn test_perfect_split() {
        let (x, y) = xor_free_data();
        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
        // One split suffices
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_pure_leaf_probabilities() {
        let (x, y) = xor_free_data();
        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        let proba = tree.predict_probabilities(&x).unwrap().unwrap();
        assert!((proba[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((proba[[7, 1]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_max_depth_limits_tree() {
        let x = Array2::from_shape_fn((32, 1), |(i, _)| i as f64);
        let y: Array1<i64> = (0..32i64).map(|i| (i / 4) % 2).collect();
        let mut tree = DecisionTree::new().with_max_depth(2);
        tree.fit(&x, &y).unwrap();
        assert!(tree.depth() <= 3);
    }

    #[test]
    fn test_regression_values() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![1.0, 1.0, 1.0, 5.0, 5.0, 5.0];
        let mut tree = DecisionTree::new();
        tree.fit_values(&x, &y).unwrap();

        let predictions = tree.predict_values(&x).unwrap();
        assert!((predictions[0] - 1.0).abs() < 1e-9);
        assert!((predictions[5] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_predict_before_fit() {
        let tree = DecisionTree::new();
        assert!(tree.predict(&array![[1.0]]).is_err());
    }
}
