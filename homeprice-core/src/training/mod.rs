//! Model training
//!
//! Provides the boosting trainer, k-fold cross-validation, regression
//! metrics, and the [`TrainEngine`] that ties them together around the
//! log-transformed target.

mod booster;
mod config;
mod cv;
mod engine;
mod metrics;

pub use booster::GbdtTrainer;
pub use config::TrainingConfig;
pub use cv::KFold;
pub use engine::TrainEngine;
pub use metrics::{mae, r2, rmse, ModelMetrics};

pub(crate) use engine::{evaluate_folds, feature_matrix, log_transform, target_vector};
