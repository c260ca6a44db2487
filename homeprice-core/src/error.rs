//! Error types for the homeprice pipeline

use thiserror::Error;

/// Result type alias for homeprice operations
pub type Result<T> = std::result::Result<T, HomepriceError>;

/// Main error type for the homeprice pipeline
#[derive(Error, Debug)]
pub enum HomepriceError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Optimization error: {0}")]
    OptimizationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Model not fitted")]
    NotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl From<polars::error::PolarsError> for HomepriceError {
    fn from(err: polars::error::PolarsError) -> Self {
        HomepriceError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for HomepriceError {
    fn from(err: serde_json::Error) -> Self {
        HomepriceError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for HomepriceError {
    fn from(err: ndarray::ShapeError) -> Self {
        HomepriceError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
