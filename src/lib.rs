//! Parkinson's disease detection from voice measurements
//!
//! This crate implements the full screening pipeline:
//! - [`data`] - CSV loading, saving, and dataset summaries
//! - [`preprocessing`] - Feature/target split, stratified splitting, scaling
//! - [`resampling`] - Class balancing (SMOTE, undersampling, SMOTE-Tomek)
//! - [`training`] - Seven classifiers behind a common [`training::Classifier`] trait
//! - [`evaluation`] - Held-out metrics, confusion matrices, model ranking
//! - [`report`] - JSON and Markdown evaluation reports
//! - [`persistence`] - Model/scaler artifacts and the prediction surface
//! - [`cli`] - Command-line and interactive interfaces

pub mod error;

pub mod data;
pub mod preprocessing;
pub mod resampling;
pub mod training;
pub mod evaluation;
pub mod report;
pub mod persistence;

pub mod cli;

pub use error::{PipelineError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PipelineError, Result};

    // Data access
    pub use crate::data::{DataLoader, DataSaver, DatasetSummary};

    // Preprocessing
    pub use crate::preprocessing::{
        prepare_data, split_features_target, stratified_split, PrepareConfig, PreparedData,
        Scaler, ScalerMethod,
    };

    // Balancing
    pub use crate::resampling::{BalanceMethod, ResampleResult, Sampler};

    // Training
    pub use crate::training::{
        Classifier, ClassifierModel, FittedModel, ModelKind, ModelSpec, ModelTrainer,
    };

    // Evaluation
    pub use crate::evaluation::{ConfusionMatrix, EvaluationRecord, ModelEvaluator};

    // Reporting
    pub use crate::report::EvaluationReport;

    // Persistence and prediction
    pub use crate::persistence::{
        find_model_file, load_model, load_preprocessing_params, predict, predict_from_csv,
        predict_single_patient, save_model, save_preprocessing_params, BatchPrediction,
        ClassLabels, PatientPrediction, PredictInput,
    };
}
