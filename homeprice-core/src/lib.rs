//! Homeprice Core - house-price regression pipeline
//!
//! This crate provides the core functionality for the homeprice pipeline:
//! CSV ingestion, cleaning and feature engineering, gradient-boosted tree
//! training with cross-validation and grid search, and submission export.

pub mod data;
pub mod error;
pub mod inference;
pub mod model;
pub mod optimizer;
pub mod pipeline;
pub mod preprocessing;
pub mod training;

pub use error::{HomepriceError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::data::{DatasetLoader, Submission};
    pub use crate::error::{HomepriceError, Result};
    pub use crate::inference::{InferenceConfig, InferenceEngine};
    pub use crate::model::GbdtModel;
    pub use crate::optimizer::{GridSearch, ParamGrid, SearchOutcome};
    pub use crate::pipeline::{PipelineRun, PricePipeline};
    pub use crate::preprocessing::{DataPreprocessor, PreprocessingConfig};
    pub use crate::training::{KFold, ModelMetrics, TrainEngine, TrainingConfig};
}
