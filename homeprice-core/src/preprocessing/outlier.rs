//! Outlier detection and handling
//!
//! Asymmetric IQR bounds between two quantiles, fitted on training data.
//! Winsorizing applies to any frame; row removal is reserved for training
//! rows, since a prediction must be produced for every test row.

use crate::error::{HomepriceError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fitted bounds for a column
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// IQR-based outlier handler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierHandler {
    low_quantile: f64,
    up_quantile: f64,
    factor: f64,
    columns: Option<Vec<String>>,
    bounds: HashMap<String, OutlierBounds>,
    is_fitted: bool,
}

impl OutlierHandler {
    /// Create a handler with the given quantile window and IQR factor
    pub fn new(low_quantile: f64, up_quantile: f64, factor: f64) -> Self {
        Self {
            low_quantile,
            up_quantile,
            factor,
            columns: None,
            bounds: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Restrict fitting to specific columns; default is every numeric column
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Fit bounds from the training frame
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let columns: Vec<String> = match &self.columns {
            Some(cols) => cols.clone(),
            None => df
                .get_column_names()
                .iter()
                .filter(|name| {
                    df.column(name.as_str())
                        .map(|s| s.dtype().is_primitive_numeric())
                        .unwrap_or(false)
                })
                .map(|s| s.to_string())
                .collect(),
        };

        self.bounds.clear();
        for col_name in &columns {
            let col = df
                .column(col_name.as_str())
                .map_err(|_| HomepriceError::ColumnNotFound(col_name.clone()))?;

            let values = numeric_values(col.as_materialized_series())?;
            if values.is_empty() {
                continue;
            }
            self.bounds
                .insert(col_name.clone(), self.compute_bounds(values));
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Winsorize out-of-bounds values to the fitted thresholds
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(HomepriceError::NotFitted);
        }

        let mut result = df.clone();

        for (col_name, bounds) in &self.bounds {
            if let Ok(col) = df.column(col_name.as_str()) {
                let series = col.as_materialized_series();
                let ca = to_f64(series)?;

                let clipped: Float64Chunked = ca
                    .into_iter()
                    .map(|opt| opt.map(|v| v.clamp(bounds.lower, bounds.upper)))
                    .collect();

                let clipped = clipped.with_name(series.name().clone()).into_series();
                result = result
                    .with_column(clipped)
                    .map_err(|e| HomepriceError::DataError(e.to_string()))?
                    .clone();
            }
        }

        Ok(result)
    }

    /// Fit and winsorize in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Remove rows whose value in any of the given key columns falls outside
    /// the fitted bounds. Training frames only.
    pub fn filter_rows(&self, df: &DataFrame, key_columns: &[String]) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(HomepriceError::NotFitted);
        }

        let mut keep = vec![true; df.height()];

        for col_name in key_columns {
            let bounds = match self.bounds.get(col_name) {
                Some(b) => *b,
                None => continue,
            };
            let col = df
                .column(col_name.as_str())
                .map_err(|_| HomepriceError::ColumnNotFound(col_name.clone()))?;
            let ca = to_f64(col.as_materialized_series())?;

            for (i, opt) in ca.into_iter().enumerate() {
                if let Some(v) = opt {
                    if !bounds.contains(v) {
                        keep[i] = false;
                    }
                }
            }
        }

        let mask = BooleanChunked::from_slice("keep".into(), &keep);
        df.filter(&mask)
            .map_err(|e| HomepriceError::DataError(e.to_string()))
    }

    /// Fitted bounds per column
    pub fn bounds(&self) -> &HashMap<String, OutlierBounds> {
        &self.bounds
    }

    fn compute_bounds(&self, mut values: Vec<f64>) -> OutlierBounds {
        values.sort_by(|a, b| a.total_cmp(b));
        let q1 = quantile_sorted(&values, self.low_quantile);
        let q3 = quantile_sorted(&values, self.up_quantile);
        let iqr = q3 - q1;
        OutlierBounds {
            lower: q1 - self.factor * iqr,
            upper: q3 + self.factor * iqr,
        }
    }
}

impl Default for OutlierHandler {
    fn default() -> Self {
        Self::new(0.10, 0.90, 1.5)
    }
}

/// Linear-interpolation quantile of a sorted slice
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

fn numeric_values(series: &Series) -> Result<Vec<f64>> {
    let ca = to_f64(series)?;
    Ok(ca.into_iter().flatten().filter(|v| v.is_finite()).collect())
}

fn to_f64(series: &Series) -> Result<Float64Chunked> {
    let cast = series
        .cast(&DataType::Float64)
        .map_err(|e| HomepriceError::DataError(e.to_string()))?;
    cast.f64()
        .map(|ca| ca.clone())
        .map_err(|e| HomepriceError::DataError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_df() -> DataFrame {
        df!(
            "GrLivArea" => &[900.0, 1000.0, 1100.0, 1200.0, 1300.0, 1400.0, 1500.0, 1600.0, 1700.0, 9000.0]
        )
        .unwrap()
    }

    #[test]
    fn test_bounds_exclude_extreme_value() {
        let df = create_test_df();
        let mut handler = OutlierHandler::default();
        handler.fit(&df).unwrap();

        let bounds = handler.bounds().get("GrLivArea").unwrap();
        assert!(bounds.upper < 9000.0);
        assert!(bounds.lower < 900.0);
    }

    #[test]
    fn test_winsorize_clips_to_bounds() {
        let df = create_test_df();
        let mut handler = OutlierHandler::default();
        let clipped = handler.fit_transform(&df).unwrap();

        let upper = handler.bounds().get("GrLivArea").unwrap().upper;
        let col = clipped.column("GrLivArea").unwrap().f64().unwrap();
        assert_eq!(col.get(9), Some(upper));
        // In-range rows are untouched.
        assert_eq!(col.get(0), Some(900.0));
    }

    #[test]
    fn test_filter_rows_removes_training_outliers() {
        let df = create_test_df();
        let mut handler = OutlierHandler::default();
        handler.fit(&df).unwrap();

        let filtered = handler
            .filter_rows(&df, &["GrLivArea".to_string()])
            .unwrap();
        assert_eq!(filtered.height(), 9);
    }

    #[test]
    fn test_filter_rows_ignores_unfitted_column() {
        let df = create_test_df();
        let mut handler = OutlierHandler::default();
        handler.fit(&df).unwrap();

        let filtered = handler
            .filter_rows(&df, &["NotAColumn".to_string()])
            .unwrap();
        assert_eq!(filtered.height(), 10);
    }

    #[test]
    fn test_quantile_sorted() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile_sorted(&values, 0.0), 1.0);
        assert_eq!(quantile_sorted(&values, 1.0), 5.0);
        assert_eq!(quantile_sorted(&values, 0.5), 3.0);
        assert_eq!(quantile_sorted(&values, 0.25), 2.0);
    }

    #[test]
    fn test_not_fitted() {
        let df = create_test_df();
        let handler = OutlierHandler::default();
        assert!(matches!(
            handler.transform(&df),
            Err(HomepriceError::NotFitted)
        ));
    }
}
