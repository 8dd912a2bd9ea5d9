//! Classifier implementations and the multi-model trainer
//!
//! Seven algorithm families cover the registry: logistic regression,
//! decision tree, random forest, SVM, k-nearest neighbors, Gaussian naive
//! Bayes, and gradient boosting. Each one is a plain serde-serializable
//! struct implementing [`Classifier`]; [`ModelTrainer`] fits a named
//! registry of them against one training partition.

pub mod classifier;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod knn;
pub mod linear;
pub mod naive_bayes;
pub mod random_forest;
pub mod svm;
pub mod trainer;

pub use classifier::{Classifier, ClassifierModel};
pub use decision_tree::DecisionTree;
pub use gradient_boosting::GradientBoosting;
pub use knn::KnnClassifier;
pub use linear::LogisticRegression;
pub use naive_bayes::GaussianNaiveBayes;
pub use random_forest::RandomForest;
pub use svm::SvmClassifier;
pub use trainer::{default_registry, FittedModel, ModelKind, ModelSpec, ModelTrainer};
