//! Training engine
//!
//! Orchestrates matrix extraction, the log-target transform, k-fold
//! cross-validation, and the final ensemble fit. Predictions come back on
//! the price scale.

use crate::error::{HomepriceError, Result};
use crate::model::GbdtModel;
use super::booster::GbdtTrainer;
use super::cv::KFold;
use super::metrics::{mae, r2, rmse, ModelMetrics};
use super::TrainingConfig;
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Main training engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainEngine {
    config: TrainingConfig,
    feature_names: Vec<String>,
    model: Option<GbdtModel>,
    metrics: Option<ModelMetrics>,
    is_fitted: bool,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            feature_names: Vec::new(),
            model: None,
            metrics: None,
            is_fitted: false,
        }
    }

    /// Fit the ensemble: cross-validate, then train on every row
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let start = Instant::now();

        let feature_names = self.resolve_feature_columns(df);
        let x = feature_matrix(df, &feature_names)?;
        let y_raw = target_vector(df, &self.config.target_column)?;
        let y = if self.config.log_target {
            log_transform(&y_raw)?
        } else {
            y_raw.clone()
        };
        self.feature_names = feature_names;

        // Out-of-fold predictions drive the reported metrics.
        let folds = KFold::new(self.config.cv_folds)
            .with_seed(self.config.seed)
            .split(x.nrows())?;
        let cv = evaluate_folds(&x, &y, &y_raw, &folds, &self.config)?;

        let mut oof = vec![0.0; x.nrows()];
        for (fold, (_, validation)) in cv.fold_predictions.iter().zip(folds.iter()) {
            for (&idx, &pred) in validation.iter().zip(fold.iter()) {
                oof[idx] = pred;
            }
        }
        let oof = Array1::from_vec(oof);
        let oof_log = if self.config.log_target {
            oof.mapv(f64::ln_1p)
        } else {
            oof.clone()
        };

        let mut metrics = ModelMetrics {
            rmse: rmse(y_raw.view(), oof.view()),
            rmse_log: rmse(y.view(), oof_log.view()),
            mae: mae(y_raw.view(), oof.view()),
            r2: r2(y_raw.view(), oof.view()),
            cv_rmse: cv.fold_rmse.iter().sum::<f64>() / cv.fold_rmse.len() as f64,
            cv_scores: cv.fold_rmse,
            ..ModelMetrics::default()
        };

        tracing::info!(
            cv_rmse = metrics.cv_rmse,
            folds = self.config.cv_folds,
            "cross-validation complete"
        );

        let model = GbdtTrainer::new(&self.config).train(x.view(), y.view())?;

        metrics.training_time_secs = start.elapsed().as_secs_f64();
        metrics.n_samples = x.nrows();
        metrics.n_features = x.ncols();
        self.metrics = Some(metrics);
        self.model = Some(model);
        self.is_fitted = true;
        Ok(self)
    }

    /// Predict prices for new data
    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(HomepriceError::NotFitted);
        }
        let model = self.model.as_ref().ok_or(HomepriceError::NotFitted)?;

        let x = feature_matrix(df, &self.feature_names)?;
        let raw = model.predict(&x.view());

        if self.config.log_target {
            Ok(raw.mapv(f64::exp_m1))
        } else {
            Ok(raw)
        }
    }

    /// Training metrics, if fitted
    pub fn metrics(&self) -> Option<&ModelMetrics> {
        self.metrics.as_ref()
    }

    /// Feature names in matrix column order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// The fitted ensemble, if any
    pub fn model(&self) -> Option<&GbdtModel> {
        self.model.as_ref()
    }

    /// Training configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Ranked feature importances (gain share, descending)
    pub fn feature_importance(&self) -> Result<Vec<(String, f64)>> {
        let model = self.model.as_ref().ok_or(HomepriceError::NotFitted)?;

        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(model.feature_importances())
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(ranked)
    }

    /// Save the engine to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load an engine from a file
    pub fn load(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let engine: Self = serde_json::from_str(&json)?;
        Ok(engine)
    }

    fn resolve_feature_columns(&self, df: &DataFrame) -> Vec<String> {
        match &self.config.feature_columns {
            Some(cols) => cols.clone(),
            None => df
                .get_column_names()
                .into_iter()
                .filter(|name| name.as_str() != self.config.target_column)
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Per-fold evaluation artifacts
pub(crate) struct FoldEvaluation {
    /// Validation RMSE per fold, on the price scale
    pub fold_rmse: Vec<f64>,
    /// Price-scale predictions for each fold's validation rows
    pub fold_predictions: Vec<Vec<f64>>,
}

/// Train and score one ensemble per fold
pub(crate) fn evaluate_folds(
    x: &Array2<f64>,
    y: &Array1<f64>,
    y_raw: &Array1<f64>,
    folds: &[(Vec<usize>, Vec<usize>)],
    config: &TrainingConfig,
) -> Result<FoldEvaluation> {
    let mut fold_rmse = Vec::with_capacity(folds.len());
    let mut fold_predictions = Vec::with_capacity(folds.len());

    for (train_idx, val_idx) in folds {
        let x_train = x.select(Axis(0), train_idx);
        let y_train = y.select(Axis(0), train_idx);
        let x_val = x.select(Axis(0), val_idx);
        let y_val_raw = y_raw.select(Axis(0), val_idx);

        let model = GbdtTrainer::new(config).train(x_train.view(), y_train.view())?;
        let pred_log = model.predict(&x_val.view());
        let pred = if config.log_target {
            pred_log.mapv(f64::exp_m1)
        } else {
            pred_log
        };

        fold_rmse.push(rmse(y_val_raw.view(), pred.view()));
        fold_predictions.push(pred.to_vec());
    }

    Ok(FoldEvaluation {
        fold_rmse,
        fold_predictions,
    })
}

/// Extract the named columns as a row-major f64 matrix
///
/// Unfilled nulls become NaN and route through the trees' default
/// directions.
pub(crate) fn feature_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = columns.len();
    let mut data = Vec::with_capacity(n_rows * n_cols);

    for col_name in columns {
        let col = df
            .column(col_name)
            .map_err(|_| HomepriceError::ColumnNotFound(col_name.clone()))?;
        let cast = col
            .as_materialized_series()
            .cast(&DataType::Float64)
            .map_err(|e| HomepriceError::DataError(e.to_string()))?;
        let ca = cast
            .f64()
            .map_err(|e| HomepriceError::DataError(e.to_string()))?;

        data.extend(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)));
    }

    let x = Array2::from_shape_vec((n_cols, n_rows), data)
        .map_err(|e| HomepriceError::ShapeError {
            expected: format!("({}, {})", n_cols, n_rows),
            actual: e.to_string(),
        })?
        .t()
        .to_owned();

    Ok(x)
}

/// Extract the target column as an f64 vector
pub(crate) fn target_vector(df: &DataFrame, target: &str) -> Result<Array1<f64>> {
    let col = df
        .column(target)
        .map_err(|_| HomepriceError::ColumnNotFound(target.to_string()))?;
    let cast = col
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(|e| HomepriceError::DataError(e.to_string()))?;
    let ca = cast
        .f64()
        .map_err(|e| HomepriceError::DataError(e.to_string()))?;

    let mut values = Vec::with_capacity(df.height());
    for (row, opt) in ca.into_iter().enumerate() {
        match opt {
            Some(v) => values.push(v),
            None => {
                return Err(HomepriceError::TrainingError(format!(
                    "missing target value at row {}",
                    row
                )))
            }
        }
    }
    Ok(Array1::from_vec(values))
}

/// ln(1 + y), rejecting non-positive prices
///
/// The transform is undefined below -1 and a non-positive price is a data
/// defect either way, so the offending row is reported rather than dropped.
pub(crate) fn log_transform(y: &Array1<f64>) -> Result<Array1<f64>> {
    for (row, &value) in y.iter().enumerate() {
        if !(value > 0.0) {
            return Err(HomepriceError::TrainingError(format!(
                "non-positive target value {} at row {}; log transform undefined",
                value, row
            )));
        }
    }
    Ok(y.mapv(f64::ln_1p))
}
