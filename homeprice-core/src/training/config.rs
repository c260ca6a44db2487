//! Training configuration

use crate::error::{HomepriceError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for fitting the boosted ensemble
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Target column name
    pub target_column: String,

    /// Feature column names (None = all except target)
    pub feature_columns: Option<Vec<String>>,

    /// Fit on the log-transformed target and exponentiate predictions
    pub log_target: bool,

    /// Number of cross-validation folds
    pub cv_folds: usize,

    /// Random seed for subsampling and fold shuffling
    pub seed: u64,

    /// Number of trees
    pub n_estimators: usize,

    /// Shrinkage applied to each tree's leaf values
    pub learning_rate: f64,

    /// Maximum tree depth
    pub max_depth: usize,

    /// Minimum samples on each side of a split
    pub min_samples_leaf: usize,

    /// Row fraction sampled per tree
    pub subsample: f64,

    /// Feature fraction sampled per tree
    pub colsample_bytree: f64,

    /// L2 regularization on leaf values
    pub reg_lambda: f64,

    /// Minimum gain required to keep a split
    pub min_gain: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target_column: "SalePrice".to_string(),
            feature_columns: None,
            log_target: true,
            cv_folds: 5,
            seed: 42,
            n_estimators: 300,
            learning_rate: 0.05,
            max_depth: 4,
            min_samples_leaf: 5,
            subsample: 0.8,
            colsample_bytree: 1.0,
            reg_lambda: 1.0,
            min_gain: 1e-12,
        }
    }
}

impl TrainingConfig {
    /// Create a configuration for the given target column
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target_column: target.into(),
            ..Default::default()
        }
    }

    /// Builder method to set the number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Builder method to set the learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Builder method to set the maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Builder method to set the minimum leaf size
    pub fn with_min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n;
        self
    }

    /// Builder method to set the number of CV folds
    pub fn with_cv(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    /// Builder method to set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to set the row subsample fraction
    pub fn with_subsample(mut self, fraction: f64) -> Self {
        self.subsample = fraction;
        self
    }

    /// Builder method to toggle the log-target transform
    pub fn with_log_target(mut self, enabled: bool) -> Self {
        self.log_target = enabled;
        self
    }

    /// Validate parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(invalid("n_estimators", "0", "must be at least 1"));
        }
        if !(self.learning_rate > 0.0) {
            return Err(invalid(
                "learning_rate",
                &self.learning_rate.to_string(),
                "must be positive",
            ));
        }
        if self.max_depth == 0 {
            return Err(invalid("max_depth", "0", "must be at least 1"));
        }
        if self.min_samples_leaf == 0 {
            return Err(invalid("min_samples_leaf", "0", "must be at least 1"));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(invalid(
                "subsample",
                &self.subsample.to_string(),
                "must be in (0, 1]",
            ));
        }
        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            return Err(invalid(
                "colsample_bytree",
                &self.colsample_bytree.to_string(),
                "must be in (0, 1]",
            ));
        }
        if self.cv_folds < 2 {
            return Err(invalid(
                "cv_folds",
                &self.cv_folds.to_string(),
                "must be at least 2",
            ));
        }
        if self.reg_lambda < 0.0 {
            return Err(invalid(
                "reg_lambda",
                &self.reg_lambda.to_string(),
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

fn invalid(name: &str, value: &str, reason: &str) -> HomepriceError {
    HomepriceError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
