//! Missing value imputation
//!
//! Fill statistics are computed from training data only and applied
//! unchanged to test data.

use crate::error::{HomepriceError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Strategy for imputing missing values in a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with mean (numeric only)
    Mean,
    /// Replace with median (numeric only)
    Median,
    /// Replace with the most frequent value (categorical)
    Mode,
    /// Replace with zero; for "absence implies none" numeric fields
    Zero,
    /// Replace with a constant value
    Constant(f64),
    /// Replace with a constant category, e.g. the "None" sentinel
    ConstantString(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum FillValue {
    Numeric(f64),
    Categorical(String),
}

/// Column-wise imputer with per-column strategy overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    numeric_strategy: ImputeStrategy,
    categorical_strategy: ImputeStrategy,
    max_categorical_cardinality: usize,
    overrides: HashMap<String, ImputeStrategy>,
    skip_columns: Vec<String>,
    fill_values: HashMap<String, FillValue>,
    is_fitted: bool,
}

impl Imputer {
    /// Create an imputer with the given default strategies
    pub fn new(numeric: ImputeStrategy, categorical: ImputeStrategy) -> Self {
        Self {
            numeric_strategy: numeric,
            categorical_strategy: categorical,
            max_categorical_cardinality: usize::MAX,
            overrides: HashMap::new(),
            skip_columns: Vec::new(),
            fill_values: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Categorical columns above this cardinality are left unimputed
    pub fn with_max_categorical_cardinality(mut self, n: usize) -> Self {
        self.max_categorical_cardinality = n;
        self
    }

    /// Set per-column strategy overrides
    pub fn with_overrides(mut self, overrides: &[(String, ImputeStrategy)]) -> Self {
        for (col, strategy) in overrides {
            self.overrides.insert(col.clone(), strategy.clone());
        }
        self
    }

    /// Columns never imputed (target, id)
    pub fn with_skip_columns(mut self, columns: Vec<String>) -> Self {
        self.skip_columns = columns;
        self
    }

    /// Fit fill values from the training frame
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        self.fill_values.clear();

        for col in df.get_columns() {
            let name = col.name().to_string();
            if self.skip_columns.contains(&name) {
                continue;
            }

            let series = col.as_materialized_series();
            let strategy = match self.overrides.get(&name) {
                Some(s) => s.clone(),
                None if series.dtype().is_primitive_numeric() => self.numeric_strategy.clone(),
                None if series.dtype() == &DataType::String => {
                    let cardinality = series.n_unique().unwrap_or(usize::MAX);
                    if cardinality > self.max_categorical_cardinality {
                        continue;
                    }
                    self.categorical_strategy.clone()
                }
                None => continue,
            };

            let fill = Self::compute_fill_value(series, &strategy)?;
            self.fill_values.insert(name, fill);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Fill missing values using the fitted statistics
    ///
    /// Numeric columns come back as Float64 so downstream stages see a
    /// uniform dtype. Columns absent from `df` are skipped.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(HomepriceError::NotFitted);
        }

        let mut result = df.clone();

        for (col_name, fill) in &self.fill_values {
            if let Ok(col) = df.column(col_name) {
                let series = col.as_materialized_series();
                let filled = Self::fill_series(series, fill)?;
                result = result
                    .with_column(filled)
                    .map_err(|e| HomepriceError::DataError(e.to_string()))?
                    .clone();
            }
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Fitted fill value for a column, if any (numeric columns)
    pub fn numeric_fill(&self, column: &str) -> Option<f64> {
        match self.fill_values.get(column) {
            Some(FillValue::Numeric(v)) => Some(*v),
            _ => None,
        }
    }

    fn compute_fill_value(series: &Series, strategy: &ImputeStrategy) -> Result<FillValue> {
        match strategy {
            ImputeStrategy::Mean => {
                let ca = Self::to_f64(series)?;
                Ok(FillValue::Numeric(ca.mean().unwrap_or(0.0)))
            }
            ImputeStrategy::Median => {
                let ca = Self::to_f64(series)?;
                Ok(FillValue::Numeric(ca.median().unwrap_or(0.0)))
            }
            ImputeStrategy::Mode => {
                if series.dtype().is_primitive_numeric() {
                    return Err(HomepriceError::ConfigError(format!(
                        "mode imputation requires a categorical column, got {} ({})",
                        series.name(),
                        series.dtype()
                    )));
                }
                Ok(FillValue::Categorical(Self::compute_mode(series)?))
            }
            ImputeStrategy::Zero => Ok(FillValue::Numeric(0.0)),
            ImputeStrategy::Constant(v) => Ok(FillValue::Numeric(*v)),
            ImputeStrategy::ConstantString(v) => Ok(FillValue::Categorical(v.clone())),
        }
    }

    /// Most frequent value; ties break toward the lexicographically smaller
    /// category so the result does not depend on row order.
    fn compute_mode(series: &Series) -> Result<String> {
        let ca = series
            .str()
            .map_err(|e| HomepriceError::DataError(e.to_string()))?;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for val in ca.into_iter().flatten() {
            *counts.entry(val).or_insert(0) += 1;
        }

        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        ranked
            .first()
            .map(|(v, _)| (*v).to_string())
            .ok_or_else(|| {
                HomepriceError::PreprocessingError(format!(
                    "column {} has no non-null values to compute a mode",
                    series.name()
                ))
            })
    }

    fn to_f64(series: &Series) -> Result<Float64Chunked> {
        let cast = series
            .cast(&DataType::Float64)
            .map_err(|e| HomepriceError::DataError(e.to_string()))?;
        cast.f64()
            .map(|ca| ca.clone())
            .map_err(|e| HomepriceError::DataError(e.to_string()))
    }

    fn fill_series(series: &Series, fill: &FillValue) -> Result<Series> {
        match fill {
            FillValue::Numeric(val) => {
                let ca = Self::to_f64(series)?;
                let filled: Float64Chunked = ca
                    .into_iter()
                    .map(|opt| Some(opt.unwrap_or(*val)))
                    .collect();
                Ok(filled.with_name(series.name().clone()).into_series())
            }
            FillValue::Categorical(val) => {
                let ca = series
                    .str()
                    .map_err(|e| HomepriceError::DataError(e.to_string()))?;
                let filled: StringChunked = ca
                    .into_iter()
                    .map(|opt| Some(opt.unwrap_or(val.as_str()).to_string()))
                    .collect();
                Ok(filled.with_name(series.name().clone()).into_series())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imputer() -> Imputer {
        Imputer::new(ImputeStrategy::Median, ImputeStrategy::Mode)
    }

    #[test]
    fn test_not_fitted() {
        let df = df!("a" => &[1.0, 2.0]).unwrap();
        let result = imputer().transform(&df);
        assert!(matches!(result, Err(HomepriceError::NotFitted)));
    }

    #[test]
    fn test_median_imputation() {
        let df = DataFrame::new(vec![Column::new(
            "LotFrontage".into(),
            &[Some(60.0), None, Some(80.0), Some(70.0)],
        )])
        .unwrap();

        let result = imputer().fit_transform(&df).unwrap();

        let col = result.column("LotFrontage").unwrap().f64().unwrap();
        assert_eq!(col.get(1), Some(70.0));
    }

    #[test]
    fn test_mode_imputation_is_order_independent() {
        let df = DataFrame::new(vec![Column::new(
            "Fence".into(),
            &[Some("GdPrv"), Some("MnPrv"), None, Some("GdPrv"), Some("MnPrv")],
        )])
        .unwrap();

        // Tie between GdPrv and MnPrv resolves lexicographically.
        let result = imputer().fit_transform(&df).unwrap();
        let col = result.column("Fence").unwrap().str().unwrap();
        assert_eq!(col.get(2), Some("GdPrv"));
    }

    #[test]
    fn test_zero_override() {
        let df = DataFrame::new(vec![Column::new(
            "GarageArea".into(),
            &[Some(400.0), None, Some(600.0)],
        )])
        .unwrap();

        let mut imp = imputer()
            .with_overrides(&[("GarageArea".to_string(), ImputeStrategy::Zero)]);
        let result = imp.fit_transform(&df).unwrap();

        let col = result.column("GarageArea").unwrap().f64().unwrap();
        assert_eq!(col.get(1), Some(0.0));
    }

    #[test]
    fn test_none_sentinel() {
        let df = DataFrame::new(vec![Column::new(
            "PoolQC".into(),
            &[None, Some("Gd"), None],
        )])
        .unwrap();

        let mut imp = imputer().with_overrides(&[(
            "PoolQC".to_string(),
            ImputeStrategy::ConstantString("None".to_string()),
        )]);
        let result = imp.fit_transform(&df).unwrap();

        let col = result.column("PoolQC").unwrap().str().unwrap();
        assert_eq!(col.get(0), Some("None"));
        assert_eq!(col.get(1), Some("Gd"));
    }

    #[test]
    fn test_high_cardinality_categorical_skipped() {
        let values: Vec<Option<String>> = (0..20)
            .map(|i| Some(format!("cat{}", i)))
            .chain(std::iter::once(None))
            .collect();
        let df = DataFrame::new(vec![Column::new("Neighborhood".into(), values)]).unwrap();

        let mut imp = imputer().with_max_categorical_cardinality(17);
        let result = imp.fit_transform(&df).unwrap();

        // Left unimputed; the encoder handles the null later.
        assert_eq!(result.column("Neighborhood").unwrap().null_count(), 1);
    }

    #[test]
    fn test_target_is_never_imputed() {
        let df = df!(
            "SalePrice" => &[Some(100.0), None],
            "LotArea" => &[Some(5000.0), None]
        )
        .unwrap();

        let mut imp = imputer().with_skip_columns(vec!["SalePrice".to_string()]);
        let result = imp.fit_transform(&df).unwrap();

        assert_eq!(result.column("SalePrice").unwrap().null_count(), 1);
        assert_eq!(result.column("LotArea").unwrap().null_count(), 0);
    }

    #[test]
    fn test_fill_values_frozen_after_fit() {
        let train = df!("x" => &[Some(1.0), Some(3.0), None]).unwrap();
        let test = df!("x" => &[Some(100.0), None]).unwrap();

        let mut imp = imputer();
        imp.fit(&train).unwrap();

        // Median of train (2.0), not of test.
        let result = imp.transform(&test).unwrap();
        let col = result.column("x").unwrap().f64().unwrap();
        assert_eq!(col.get(1), Some(2.0));
    }
}
