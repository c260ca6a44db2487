//! Categorical encoding
//!
//! Three stages share this module: rare-category grouping, fixed-rank
//! ordinal encoding, and one-hot encoding with a vocabulary frozen by the
//! training frame. A category unseen at prediction time never aborts the
//! pipeline: ordinal columns fall back to code 0 and one-hot columns to the
//! all-zero indicator row.

use crate::error::{HomepriceError, Result};
use crate::preprocessing::config::OrdinalSpec;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Label applied to categories below the rare-frequency threshold
pub const RARE_LABEL: &str = "Rare";

/// Collapses infrequent categories into a single "Rare" label
///
/// The kept-category sets are fixed by the training frame, so a category
/// that is frequent in test data but rare in training still maps to "Rare".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RareGrouper {
    threshold: f64,
    kept: HashMap<String, BTreeSet<String>>,
    is_fitted: bool,
}

impl RareGrouper {
    /// Create a grouper; categories with training frequency below
    /// `threshold` collapse into [`RARE_LABEL`]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            kept: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Fit kept-category sets from the training frame
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        self.kept.clear();
        let total = df.height() as f64;

        for col_name in columns {
            let col = df
                .column(col_name.as_str())
                .map_err(|_| HomepriceError::ColumnNotFound(col_name.clone()))?;
            let ca = col
                .str()
                .map_err(|e| HomepriceError::DataError(e.to_string()))?;

            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for val in ca.into_iter().flatten() {
                *counts.entry(val).or_insert(0) += 1;
            }

            let kept: BTreeSet<String> = counts
                .into_iter()
                .filter(|(_, count)| *count as f64 / total >= self.threshold)
                .map(|(v, _)| v.to_string())
                .collect();
            self.kept.insert(col_name.clone(), kept);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Replace rare categories with [`RARE_LABEL`] in the fitted columns
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(HomepriceError::NotFitted);
        }

        let mut result = df.clone();

        for (col_name, kept) in &self.kept {
            if let Ok(col) = df.column(col_name) {
                let series = col.as_materialized_series();
                let ca = series
                    .str()
                    .map_err(|e| HomepriceError::DataError(e.to_string()))?;

                let grouped: StringChunked = ca
                    .into_iter()
                    .map(|opt| {
                        opt.map(|v| {
                            if kept.contains(v) {
                                v.to_string()
                            } else {
                                RARE_LABEL.to_string()
                            }
                        })
                    })
                    .collect();

                let grouped = grouped.with_name(series.name().clone()).into_series();
                result = result
                    .with_column(grouped)
                    .map_err(|e| HomepriceError::DataError(e.to_string()))?
                    .clone();
            }
        }

        Ok(result)
    }

    /// Kept categories for a column, if fitted
    pub fn kept_categories(&self, column: &str) -> Option<&BTreeSet<String>> {
        self.kept.get(column)
    }
}

/// Maps ordinal categories to integers via a configured rank order
///
/// The order is part of the configuration, not learned; `fit` only
/// validates that the columns exist, which is fatal when they do not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdinalEncoder {
    specs: Vec<OrdinalSpec>,
    is_fitted: bool,
}

impl OrdinalEncoder {
    /// Create an encoder from configured rank orders
    pub fn new(specs: Vec<OrdinalSpec>) -> Self {
        Self {
            specs,
            is_fitted: false,
        }
    }

    /// Validate that every configured column exists in the frame
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        for spec in &self.specs {
            if df.column(&spec.column).is_err() {
                return Err(HomepriceError::ColumnNotFound(spec.column.clone()));
            }
        }
        self.is_fitted = true;
        Ok(self)
    }

    /// Encode the configured columns in place as Int64 codes
    ///
    /// Values outside the configured order (unseen at prediction time)
    /// encode to 0, the lowest rank.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(HomepriceError::NotFitted);
        }

        let mut result = df.clone();

        for spec in &self.specs {
            if let Ok(col) = df.column(&spec.column) {
                let series = col.as_materialized_series();
                let ca = series
                    .str()
                    .map_err(|e| HomepriceError::DataError(e.to_string()))?;

                let codes: Vec<i64> = ca
                    .into_iter()
                    .map(|opt| {
                        opt.and_then(|v| {
                            spec.levels.iter().position(|level| level == v)
                        })
                        .map(|rank| rank as i64)
                        .unwrap_or(0)
                    })
                    .collect();

                let encoded = Series::new(spec.column.as_str().into(), codes);
                result = result
                    .with_column(encoded)
                    .map_err(|e| HomepriceError::DataError(e.to_string()))?
                    .clone();
            }
        }

        Ok(result)
    }

    /// Columns this encoder handles
    pub fn columns(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.column.as_str()).collect()
    }
}

/// One-hot encoder with a training-frozen, sorted vocabulary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    // Column name -> sorted category list; sorting keeps indicator columns
    // and codes independent of row order.
    categories: BTreeMap<String, Vec<String>>,
    is_fitted: bool,
}

impl OneHotEncoder {
    /// Create an unfitted encoder
    pub fn new() -> Self {
        Self {
            categories: BTreeMap::new(),
            is_fitted: false,
        }
    }

    /// Fit the vocabulary from the training frame
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        self.categories.clear();

        for col_name in columns {
            let col = df
                .column(col_name.as_str())
                .map_err(|_| HomepriceError::ColumnNotFound(col_name.clone()))?;
            let ca = col
                .str()
                .map_err(|e| HomepriceError::DataError(e.to_string()))?;

            let unique: BTreeSet<String> =
                ca.into_iter().flatten().map(|v| v.to_string()).collect();
            self.categories
                .insert(col_name.clone(), unique.into_iter().collect());
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Expand fitted columns into indicator columns and drop the originals
    ///
    /// A value with no matching training category (or a null) produces the
    /// all-zero indicator row.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(HomepriceError::NotFitted);
        }

        let mut result = df.clone();

        for (col_name, categories) in &self.categories {
            if let Ok(col) = df.column(col_name) {
                let ca = col
                    .str()
                    .map_err(|e| HomepriceError::DataError(e.to_string()))?;

                for category in categories {
                    let indicator_name = format!("{}_{}", col_name, category);
                    let values: Vec<i32> = ca
                        .into_iter()
                        .map(|v| i32::from(v == Some(category.as_str())))
                        .collect();

                    let indicator = Series::new(indicator_name.into(), values);
                    result = result
                        .with_column(indicator)
                        .map_err(|e| HomepriceError::DataError(e.to_string()))?
                        .clone();
                }

                result = result
                    .drop(col_name)
                    .map_err(|e| HomepriceError::DataError(e.to_string()))?;
            }
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Fitted category list for a column
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.categories.get(column).map(|v| v.as_slice())
    }
}

impl Default for OneHotEncoder {
    fn default() -> Self {
        Self::new()
    }
}
