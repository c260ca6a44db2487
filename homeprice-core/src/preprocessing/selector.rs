//! Column selection

use crate::error::{HomepriceError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Drops configured non-predictive columns from the frame
///
/// Columns already absent are ignored: the drop list covers both the train
/// frame (which carries the target) and the test frame (which does not).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSelector {
    drop_columns: Vec<String>,
}

impl FeatureSelector {
    /// Create a selector from a drop list
    pub fn new(drop_columns: Vec<String>) -> Self {
        Self { drop_columns }
    }

    /// Remove the configured columns where present
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut result = df.clone();
        for col_name in &self.drop_columns {
            if result.column(col_name).is_ok() {
                result = result
                    .drop(col_name)
                    .map_err(|e| HomepriceError::DataError(e.to_string()))?;
            }
        }
        Ok(result)
    }

    /// Configured drop list
    pub fn drop_columns(&self) -> &[String] {
        &self.drop_columns
    }
}
