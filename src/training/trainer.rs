//! Named model registry and the multi-model trainer
//!
//! The registry is plain data handed to [`ModelTrainer`]; nothing lives in
//! process-wide state, so two pipeline runs with the same inputs produce
//! the same fitted models.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::training::{
    Classifier, ClassifierModel, DecisionTree, GaussianNaiveBayes, GradientBoosting,
    KnnClassifier, LogisticRegression, RandomForest, SvmClassifier,
};

/// Hyperparameters for one registry entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelKind {
    LogisticRegression {
        max_iter: usize,
        learning_rate: f64,
        l2: f64,
    },
    DecisionTree {
        max_depth: usize,
    },
    RandomForest {
        n_estimators: usize,
        max_depth: usize,
        seed: u64,
    },
    Svm {
        c: f64,
        seed: u64,
    },
    Knn {
        k: usize,
    },
    NaiveBayes {
        var_smoothing: f64,
    },
    GradientBoosting {
        n_estimators: usize,
        learning_rate: f64,
        max_depth: usize,
        seed: u64,
    },
}

impl ModelKind {
    /// Construct an unfitted model with these hyperparameters.
    pub fn build(&self) -> ClassifierModel {
        match *self {
            ModelKind::LogisticRegression {
                max_iter,
                learning_rate,
                l2,
            } => ClassifierModel::Logistic(
                LogisticRegression::new()
                    .with_max_iter(max_iter)
                    .with_learning_rate(learning_rate)
                    .with_l2(l2),
            ),
            ModelKind::DecisionTree { max_depth } => {
                ClassifierModel::DecisionTree(DecisionTree::new().with_max_depth(max_depth))
            }
            ModelKind::RandomForest {
                n_estimators,
                max_depth,
                seed,
            } => ClassifierModel::RandomForest(
                RandomForest::new(seed)
                    .with_n_estimators(n_estimators)
                    .with_max_depth(max_depth),
            ),
            ModelKind::Svm { c, seed } => {
                ClassifierModel::Svm(SvmClassifier::new(seed).with_c(c))
            }
            ModelKind::Knn { k } => ClassifierModel::Knn(KnnClassifier::new().with_k(k)),
            ModelKind::NaiveBayes { var_smoothing } => ClassifierModel::NaiveBayes(
                GaussianNaiveBayes::new().with_var_smoothing(var_smoothing),
            ),
            ModelKind::GradientBoosting {
                n_estimators,
                learning_rate,
                max_depth,
                seed,
            } => ClassifierModel::GradientBoosting(
                GradientBoosting::new(seed)
                    .with_n_estimators(n_estimators)
                    .with_learning_rate(learning_rate)
                    .with_max_depth(max_depth),
            ),
        }
    }
}

/// One named classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub kind: ModelKind,
}

impl ModelSpec {
    pub fn new(name: impl Into<String>, kind: ModelKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// The standard seven-entry registry. Entry order doubles as the ranking
/// tie-break order downstream.
pub fn default_registry(seed: u64) -> Vec<ModelSpec> {
    vec![
        ModelSpec::new(
            "Logistic Regression",
            ModelKind::LogisticRegression {
                max_iter: 1000,
                learning_rate: 0.1,
                l2: 0.01,
            },
        ),
        ModelSpec::new("Decision Tree", ModelKind::DecisionTree { max_depth: 10 }),
        ModelSpec::new(
            "Random Forest",
            ModelKind::RandomForest {
                n_estimators: 100,
                max_depth: 10,
                seed,
            },
        ),
        ModelSpec::new("SVM", ModelKind::Svm { c: 1.0, seed }),
        ModelSpec::new("KNN", ModelKind::Knn { k: 5 }),
        ModelSpec::new("Naive Bayes", ModelKind::NaiveBayes { var_smoothing: 1e-9 }),
        ModelSpec::new(
            "Gradient Boosting",
            ModelKind::GradientBoosting {
                n_estimators: 100,
                learning_rate: 0.1,
                max_depth: 3,
                seed,
            },
        ),
    ]
}

/// A named, fitted classifier ready for evaluation or persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    pub name: String,
    pub model: ClassifierModel,
}

/// Fits every entry of an explicit registry against one training partition.
pub struct ModelTrainer {
    specs: Vec<ModelSpec>,
}

impl Default for ModelTrainer {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelTrainer {
    /// Trainer over [`default_registry`] with seed 42.
    pub fn new() -> Self {
        Self {
            specs: default_registry(42),
        }
    }

    pub fn with_registry(specs: Vec<ModelSpec>) -> Self {
        Self { specs }
    }

    pub fn registry(&self) -> &[ModelSpec] {
        &self.specs
    }

    /// Fit the named configuration. An unknown name is a lookup error.
    pub fn train_single_model(
        &self,
        name: &str,
        x_train: &Array2<f64>,
        y_train: &Array1<i64>,
    ) -> Result<FittedModel> {
        let spec = self
            .specs
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| PipelineError::UnknownModel(name.to_string()))?;

        let mut model = spec.kind.build();
        model.fit(x_train, y_train)?;

        Ok(FittedModel {
            name: spec.name.clone(),
            model,
        })
    }

    /// Fit every registered configuration. A failing fit is logged and
    /// skipped; the return holds every model that could fit.
    pub fn train_all_models(
        &self,
        x_train: &Array2<f64>,
        y_train: &Array1<i64>,
    ) -> Vec<FittedModel> {
        let mut fitted = Vec::with_capacity(self.specs.len());

        for spec in &self.specs {
            tracing::info!(model = %spec.name, "training");
            let mut model = spec.kind.build();
            match model.fit(x_train, y_train) {
                Ok(()) => fitted.push(FittedModel {
                    name: spec.name.clone(),
                    model,
                }),
                Err(e) => {
                    tracing::warn!(model = %spec.name, error = %e, "training failed, skipping");
                }
            }
        }

        fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_data() -> (Array2<f64>, Array1<i64>) {
        let x = Array2::from_shape_fn((30, 3), |(i, j)| {
            let base = if i < 15 { 0.0 } else { 5.0 };
            base + ((i * 3 + j) % 7) as f64 * 0.1
        });
        let y: Array1<i64> = (0..30).map(|i| if i < 15 { 0 } else { 1 }).collect();
        (x, y)
    }

    #[test]
    fn test_default_registry_order() {
        let registry = default_registry(42);
        let names: Vec<&str> = registry.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Logistic Regression",
                "Decision Tree",
                "Random Forest",
                "SVM",
                "KNN",
                "Naive Bayes",
                "Gradient Boosting",
            ]
        );
    }

    #[test]
    fn test_train_single_model() {
        let (x, y) = training_data();
        let trainer = ModelTrainer::new();

        let fitted = trainer.train_single_model("Decision Tree", &x, &y).unwrap();
        assert_eq!(fitted.name, "Decision Tree");
        let predictions = fitted.model.predict(&x).unwrap();
        assert_eq!(predictions.len(), 30);
    }

    #[test]
    fn test_unknown_model_name() {
        let (x, y) = training_data();
        let trainer = ModelTrainer::new();
        let result = trainer.train_single_model("Perceptron", &x, &y);
        assert!(matches!(result, Err(PipelineError::UnknownModel(_))));
    }

    #[test]
    fn test_train_all_models_fits_whole_registry() {
        let (x, y) = training_data();
        let trainer = ModelTrainer::new();
        let fitted = trainer.train_all_models(&x, &y);
        assert_eq!(fitted.len(), 7);
        for model in &fitted {
            let predictions = model.model.predict(&x).unwrap();
            assert_eq!(predictions.len(), 30);
        }
    }

    #[test]
    fn test_single_class_data_fits_nothing() {
        let x = Array2::zeros((10, 2));
        let y = Array1::from_elem(10, 1i64);
        let trainer = ModelTrainer::new();
        let fitted = trainer.train_all_models(&x, &y);
        assert!(fitted.is_empty());
    }
}
