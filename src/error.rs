//! Error types for the detection pipeline

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, PipelineError>;

/// All error conditions the pipeline can surface
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Data error: {0}")]
    Data(String),

    #[error("Preprocessing error: {0}")]
    Preprocessing(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Prediction error: {0}")]
    Prediction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown model: '{0}' is not in the registry")]
    UnknownModel(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted: call fit() before predict()")]
    ModelNotFitted,

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Invalid parameter '{name}' = '{value}': {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<polars::error::PolarsError> for PipelineError {
    fn from(err: polars::error::PolarsError) -> Self {
        PipelineError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PipelineError {
    fn from(err: ndarray::ShapeError) -> Self {
        PipelineError::Shape {
            expected: "compatible array dimensions".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::UnknownModel("Quantum Forest".to_string());
        assert_eq!(
            err.to_string(),
            "Unknown model: 'Quantum Forest' is not in the registry"
        );

        let err = PipelineError::FeatureNotFound("spread1".to_string());
        assert_eq!(err.to_string(), "Feature not found: spread1");

        let err = PipelineError::ModelNotFitted;
        assert!(err.to_string().contains("fit()"));
    }

    #[test]
    fn test_shape_error() {
        let err = PipelineError::Shape {
            expected: "22 columns".to_string(),
            actual: "21 columns".to_string(),
        };
        assert_eq!(err.to_string(), "Shape mismatch: expected 22 columns, got 21 columns");
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
