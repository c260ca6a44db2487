//! Inference engine
//!
//! Applies a fitted preprocessor and training engine to a raw test frame
//! and assembles the submission: one prediction per input row, ids in
//! input order.

use crate::data::Submission;
use crate::error::{HomepriceError, Result};
use crate::preprocessing::DataPreprocessor;
use crate::training::TrainEngine;
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Inference configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Id column expected in the raw test frame
    pub id_column: String,
    /// Name of the predicted price column in the submission
    pub price_column: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            id_column: "Id".to_string(),
            price_column: "SalePrice".to_string(),
        }
    }
}

impl InferenceConfig {
    /// Create a config with default column names
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the id column
    pub fn with_id_column(mut self, id: impl Into<String>) -> Self {
        self.id_column = id.into();
        self
    }

    /// Builder method to set the predicted price column name
    pub fn with_price_column(mut self, name: impl Into<String>) -> Self {
        self.price_column = name.into();
        self
    }
}

/// Inference engine over a fitted preprocessor and model
#[derive(Debug)]
pub struct InferenceEngine {
    config: InferenceConfig,
    preprocessor: Option<Arc<DataPreprocessor>>,
    engine: Option<Arc<TrainEngine>>,
}

impl InferenceEngine {
    /// Create a new inference engine
    pub fn new(config: InferenceConfig) -> Self {
        Self {
            config,
            preprocessor: None,
            engine: None,
        }
    }

    /// Attach a fitted preprocessor
    pub fn with_preprocessor(mut self, preprocessor: DataPreprocessor) -> Self {
        self.preprocessor = Some(Arc::new(preprocessor));
        self
    }

    /// Attach a fitted training engine
    pub fn with_model(mut self, engine: TrainEngine) -> Self {
        self.engine = Some(Arc::new(engine));
        self
    }

    /// Load preprocessor and model from files
    pub fn load(
        config: InferenceConfig,
        preprocessor_path: Option<&str>,
        model_path: &str,
    ) -> Result<Self> {
        let mut engine = Self::new(config);

        if let Some(path) = preprocessor_path {
            engine.preprocessor = Some(Arc::new(DataPreprocessor::load(path)?));
        }
        engine.engine = Some(Arc::new(TrainEngine::load(model_path)?));

        Ok(engine)
    }

    /// Predict prices for a raw test frame
    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let engine = self.engine.as_ref().ok_or(HomepriceError::NotFitted)?;

        let processed = match &self.preprocessor {
            Some(preprocessor) => preprocessor.transform(df)?,
            None => df.clone(),
        };

        engine.predict(&processed)
    }

    /// Predict and assemble the submission, preserving input row order
    pub fn predict_submission(&self, df: &DataFrame) -> Result<Submission> {
        let ids = extract_ids(df, &self.config.id_column)?;
        let predictions = self.predict(df)?;

        Submission::new(
            self.config.id_column.clone(),
            self.config.price_column.clone(),
            ids,
            predictions.to_vec(),
        )
    }
}

/// Read the id column as i64, in row order
fn extract_ids(df: &DataFrame, id_column: &str) -> Result<Vec<i64>> {
    let col = df
        .column(id_column)
        .map_err(|_| HomepriceError::ColumnNotFound(id_column.to_string()))?;
    let cast = col
        .as_materialized_series()
        .cast(&DataType::Int64)
        .map_err(|e| HomepriceError::DataError(e.to_string()))?;
    let ca = cast
        .i64()
        .map_err(|e| HomepriceError::DataError(e.to_string()))?;

    let mut ids = Vec::with_capacity(df.height());
    for (row, opt) in ca.into_iter().enumerate() {
        match opt {
            Some(id) => ids.push(id),
            None => {
                return Err(HomepriceError::InferenceError(format!(
                    "missing id at row {}",
                    row
                )))
            }
        }
    }
    Ok(ids)
}
