//! Exhaustive grid search
//!
//! Every configuration in the cartesian product of the value lists is
//! scored by mean cross-validated RMSE on the price scale; the minimizing
//! configuration wins. All candidates share the same fold assignment so
//! scores are comparable.

use crate::error::{HomepriceError, Result};
use crate::training::{evaluate_folds, feature_matrix, log_transform, target_vector};
use crate::training::{KFold, TrainingConfig};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Value lists defining the search grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamGrid {
    pub learning_rates: Vec<f64>,
    pub max_depths: Vec<usize>,
    pub n_estimators: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            learning_rates: vec![0.03, 0.05, 0.1],
            max_depths: vec![3, 4, 6],
            n_estimators: vec![200, 400],
            min_samples_leaf: vec![5, 10],
        }
    }
}

impl ParamGrid {
    /// A deliberately small grid for quick runs
    pub fn coarse() -> Self {
        Self {
            learning_rates: vec![0.05, 0.1],
            max_depths: vec![3, 5],
            n_estimators: vec![200],
            min_samples_leaf: vec![5],
        }
    }

    /// Enumerate the cartesian product
    pub fn candidates(&self) -> Vec<GridPoint> {
        let mut points = Vec::new();
        for &learning_rate in &self.learning_rates {
            for &max_depth in &self.max_depths {
                for &n_estimators in &self.n_estimators {
                    for &min_samples_leaf in &self.min_samples_leaf {
                        points.push(GridPoint {
                            learning_rate,
                            max_depth,
                            n_estimators,
                            min_samples_leaf,
                        });
                    }
                }
            }
        }
        points
    }

    fn validate(&self) -> Result<()> {
        if self.learning_rates.is_empty()
            || self.max_depths.is_empty()
            || self.n_estimators.is_empty()
            || self.min_samples_leaf.is_empty()
        {
            return Err(HomepriceError::OptimizationError(
                "every grid dimension needs at least one value".to_string(),
            ));
        }
        Ok(())
    }
}

/// One point of the grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub learning_rate: f64,
    pub max_depth: usize,
    pub n_estimators: usize,
    pub min_samples_leaf: usize,
}

impl GridPoint {
    /// Apply this point on top of a base configuration
    pub fn apply(&self, base: &TrainingConfig) -> TrainingConfig {
        let mut config = base.clone();
        config.learning_rate = self.learning_rate;
        config.max_depth = self.max_depth;
        config.n_estimators = self.n_estimators;
        config.min_samples_leaf = self.min_samples_leaf;
        config
    }
}

/// Scored candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub point: GridPoint,
    pub mean_rmse: f64,
    pub fold_rmse: Vec<f64>,
}

/// Result of a completed search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Winning configuration, ready for a final fit
    pub best_config: TrainingConfig,
    pub best: TrialOutcome,
    /// Every trial, in candidate order
    pub trials: Vec<TrialOutcome>,
}

/// Exhaustive hyperparameter search over a [`ParamGrid`]
pub struct GridSearch {
    base: TrainingConfig,
    grid: ParamGrid,
}

impl GridSearch {
    /// Create a search from a base configuration and a grid
    pub fn new(base: TrainingConfig, grid: ParamGrid) -> Self {
        Self { base, grid }
    }

    /// Run the search against a preprocessed training frame
    pub fn search(&self, df: &DataFrame) -> Result<SearchOutcome> {
        self.grid.validate()?;

        let feature_names: Vec<String> = match &self.base.feature_columns {
            Some(cols) => cols.clone(),
            None => df
                .get_column_names()
                .into_iter()
                .filter(|name| name.as_str() != self.base.target_column)
                .map(|s| s.to_string())
                .collect(),
        };

        let x = feature_matrix(df, &feature_names)?;
        let y_raw = target_vector(df, &self.base.target_column)?;
        let y = if self.base.log_target {
            log_transform(&y_raw)?
        } else {
            y_raw.clone()
        };

        // One fold assignment for every candidate.
        let folds = KFold::new(self.base.cv_folds)
            .with_seed(self.base.seed)
            .split(x.nrows())?;

        let candidates = self.grid.candidates();
        tracing::info!(n_candidates = candidates.len(), "starting grid search");

        let trials: Vec<TrialOutcome> = candidates
            .par_iter()
            .map(|point| {
                let config = point.apply(&self.base);
                let evaluation = evaluate_folds(&x, &y, &y_raw, &folds, &config)?;
                let mean_rmse = evaluation.fold_rmse.iter().sum::<f64>()
                    / evaluation.fold_rmse.len() as f64;

                tracing::debug!(
                    learning_rate = point.learning_rate,
                    max_depth = point.max_depth,
                    n_estimators = point.n_estimators,
                    mean_rmse,
                    "trial scored"
                );

                Ok(TrialOutcome {
                    point: *point,
                    mean_rmse,
                    fold_rmse: evaluation.fold_rmse,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let best = trials
            .iter()
            .filter(|t| t.mean_rmse.is_finite())
            .min_by(|a, b| a.mean_rmse.total_cmp(&b.mean_rmse))
            .cloned()
            .ok_or_else(|| {
                HomepriceError::OptimizationError(
                    "no candidate produced a finite score".to_string(),
                )
            })?;

        tracing::info!(
            mean_rmse = best.mean_rmse,
            learning_rate = best.point.learning_rate,
            max_depth = best.point.max_depth,
            n_estimators = best.point.n_estimators,
            "grid search complete"
        );

        Ok(SearchOutcome {
            best_config: best.point.apply(&self.base),
            best,
            trials,
        })
    }
}
