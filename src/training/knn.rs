//! K-nearest-neighbor classification

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::training::classifier::{expand_binary_proba, validate_binary_labels, Classifier};

/// Max-heap entry so the heap evicts the farthest of the current k.
#[derive(Debug, Clone, Copy)]
struct DistLabel(f64, i64);

impl PartialEq for DistLabel {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for DistLabel {}
impl PartialOrd for DistLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// Lazy learner: stores the training matrix and votes among the k nearest
/// rows at predict time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnClassifier {
    k: usize,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<i64>>,
}

impl Default for KnnClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl KnnClassifier {
    pub fn new() -> Self {
        Self {
            k: 5,
            x_train: None,
            y_train: None,
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k.max(1);
        self
    }

    /// Positive-class share among the k nearest training rows.
    fn neighbor_share(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let x_train = self.x_train.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        let y_train = self.y_train.as_ref().ok_or(PipelineError::ModelNotFitted)?;

        if x.ncols() != x_train.ncols() {
            return Err(PipelineError::Shape {
                expected: format!("{} features", x_train.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let k = self.k.min(x_train.nrows());
        let shares: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| row.iter().copied().collect::<Vec<f64>>())
            .collect::<Vec<_>>()
            .par_iter()
            .map(|query| {
                let mut heap: BinaryHeap<DistLabel> = BinaryHeap::with_capacity(k + 1);
                for (train_row, &label) in x_train.rows().into_iter().zip(y_train.iter()) {
                    let dist: f64 = train_row
                        .iter()
                        .zip(query.iter())
                        .map(|(a, b)| (a - b).powi(2))
                        .sum();
                    if heap.len() < k {
                        heap.push(DistLabel(dist, label));
                    } else if let Some(&DistLabel(max_dist, _)) = heap.peek() {
                        if dist < max_dist {
                            heap.pop();
                            heap.push(DistLabel(dist, label));
                        }
                    }
                }
                let positives = heap.iter().filter(|DistLabel(_, l)| *l == 1).count();
                positives as f64 / k as f64
            })
            .collect();

        Ok(Array1::from_vec(shares))
    }
}

impl Classifier for KnnClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        validate_binary_labels(y)?;
        if x.nrows() != y.len() {
            return Err(PipelineError::Shape {
                expected: format!("{} rows", y.len()),
                actual: format!("{} rows", x.nrows()),
            });
        }

        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let shares = self.neighbor_share(x)?;
        // Exact vote ties resolve to the negative class
        Ok(shares.mapv(|s| if s > 0.5 { 1 } else { 0 }))
    }

    fn predict_probabilities(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        let shares = self.neighbor_share(x)?;
        Ok(Some(expand_binary_proba(&shares)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn cluster_data() -> (Array2<f64>, Array1<i64>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.0],
            [0.0, 0.2],
            [5.0, 5.0],
            [5.1, 5.1],
            [5.2, 5.0],
            [5.0, 5.2],
        ];
        let y = array![0i64, 0, 0, 0, 1, 1, 1, 1];
        (x, y)
    }

    #[test]
    fn test_knn_classifies_clusters() {
        let (x, y) = cluster_data();
        let mut knn = KnnClassifier::new().with_k(3);
        knn.fit(&x, &y).unwrap();

        let predictions = knn.predict(&array![[0.05, 0.05], [5.05, 5.05]]).unwrap();
        assert_eq!(predictions, array![0i64, 1]);
    }

    #[test]
    fn test_knn_probabilities_are_neighbor_shares() {
        let (x, y) = cluster_data();
        let mut knn = KnnClassifier::new().with_k(3);
        knn.fit(&x, &y).unwrap();

        let proba = knn.predict_probabilities(&array![[0.05, 0.05]]).unwrap().unwrap();
        // All 3 nearest neighbors are negative
        assert!((proba[[0, 0]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_knn_unfitted_errors() {
        let knn = KnnClassifier::new();
        assert!(matches!(
            knn.predict(&array![[1.0, 2.0]]),
            Err(PipelineError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_knn_feature_mismatch() {
        let (x, y) = cluster_data();
        let mut knn = KnnClassifier::new();
        knn.fit(&x, &y).unwrap();
        assert!(matches!(
            knn.predict(&array![[1.0, 2.0, 3.0]]),
            Err(PipelineError::Shape { .. })
        ));
    }
}
