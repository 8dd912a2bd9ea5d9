//! The polymorphic classifier seam
//!
//! Every algorithm in the registry implements [`Classifier`]. Probability
//! support is a tri-state: `Ok(Some(...))` for per-class scores,
//! `Ok(None)` when the algorithm has no probability notion (the SVM), and
//! `Err` for an actual failure such as predicting before fitting.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::training::{
    DecisionTree, GaussianNaiveBayes, GradientBoosting, KnnClassifier, LogisticRegression,
    RandomForest, SvmClassifier,
};

/// Binary classifier over a numeric feature matrix. Labels are `0` and `1`.
pub trait Classifier: Send + Sync {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()>;

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>>;

    /// Per-class probabilities, columns `[P(0), P(1)]`, rows summing to 1.
    /// `Ok(None)` means the fitted model has no probability support.
    fn predict_probabilities(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>>;
}

/// Reject anything other than a two-class 0/1 target.
pub(crate) fn validate_binary_labels(y: &Array1<i64>) -> Result<()> {
    if y.is_empty() {
        return Err(PipelineError::Training("Empty target vector".to_string()));
    }
    if y.iter().any(|&v| v != 0 && v != 1) {
        return Err(PipelineError::Training(
            "Target labels must be 0 or 1".to_string(),
        ));
    }
    let has_zero = y.iter().any(|&v| v == 0);
    let has_one = y.iter().any(|&v| v == 1);
    if !has_zero || !has_one {
        return Err(PipelineError::Training(
            "Training data must contain both classes".to_string(),
        ));
    }
    Ok(())
}

/// Turn one positive-class probability column into the `[P(0), P(1)]` pair.
pub(crate) fn expand_binary_proba(positive: &Array1<f64>) -> Array2<f64> {
    Array2::from_shape_fn((positive.len(), 2), |(i, j)| {
        if j == 0 {
            1.0 - positive[i]
        } else {
            positive[i]
        }
    })
}

/// One concrete model per registry entry. The enum keeps persistence a
/// single serde round-trip and dispatch a plain match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "algorithm")]
pub enum ClassifierModel {
    Logistic(LogisticRegression),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    Svm(SvmClassifier),
    Knn(KnnClassifier),
    NaiveBayes(GaussianNaiveBayes),
    GradientBoosting(GradientBoosting),
}

impl Classifier for ClassifierModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        match self {
            ClassifierModel::Logistic(m) => m.fit(x, y),
            ClassifierModel::DecisionTree(m) => m.fit(x, y),
            ClassifierModel::RandomForest(m) => m.fit(x, y),
            ClassifierModel::Svm(m) => m.fit(x, y),
            ClassifierModel::Knn(m) => m.fit(x, y),
            ClassifierModel::NaiveBayes(m) => m.fit(x, y),
            ClassifierModel::GradientBoosting(m) => m.fit(x, y),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        match self {
            ClassifierModel::Logistic(m) => m.predict(x),
            ClassifierModel::DecisionTree(m) => m.predict(x),
            ClassifierModel::RandomForest(m) => m.predict(x),
            ClassifierModel::Svm(m) => m.predict(x),
            ClassifierModel::Knn(m) => m.predict(x),
            ClassifierModel::NaiveBayes(m) => m.predict(x),
            ClassifierModel::GradientBoosting(m) => m.predict(x),
        }
    }

    fn predict_probabilities(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        match self {
            ClassifierModel::Logistic(m) => m.predict_probabilities(x),
            ClassifierModel::DecisionTree(m) => m.predict_probabilities(x),
            ClassifierModel::RandomForest(m) => m.predict_probabilities(x),
            ClassifierModel::Svm(m) => m.predict_probabilities(x),
            ClassifierModel::Knn(m) => m.predict_probabilities(x),
            ClassifierModel::NaiveBayes(m) => m.predict_probabilities(x),
            ClassifierModel::GradientBoosting(m) => m.predict_probabilities(x),
        }
    }
}
