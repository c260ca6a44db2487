//! Derived feature construction
//!
//! Derivations are pure functions of one row: no statistics are learned,
//! so the same definitions apply to train and test frames. A missing input
//! column is a schema error and is surfaced, never skipped.

use crate::error::{HomepriceError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Definition of one derived column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Derivation {
    /// Sum of the input columns, e.g. a total-area aggregate
    Sum { name: String, inputs: Vec<String> },
    /// `later - earlier`, clamped at zero, e.g. age from a year pair
    YearDiff {
        name: String,
        later: String,
        earlier: String,
    },
    /// Weighted combination, e.g. a composite quality score over
    /// ordinal-encoded ratings
    WeightedSum {
        name: String,
        terms: Vec<(String, f64)>,
    },
}

impl Derivation {
    pub fn sum(name: impl Into<String>, inputs: &[&str]) -> Self {
        Derivation::Sum {
            name: name.into(),
            inputs: inputs.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    pub fn year_diff(
        name: impl Into<String>,
        later: impl Into<String>,
        earlier: impl Into<String>,
    ) -> Self {
        Derivation::YearDiff {
            name: name.into(),
            later: later.into(),
            earlier: earlier.into(),
        }
    }

    pub fn weighted_sum(name: impl Into<String>, terms: &[(&str, f64)]) -> Self {
        Derivation::WeightedSum {
            name: name.into(),
            terms: terms.iter().map(|(c, w)| ((*c).to_string(), *w)).collect(),
        }
    }

    /// Name of the derived output column
    pub fn name(&self) -> &str {
        match self {
            Derivation::Sum { name, .. } => name,
            Derivation::YearDiff { name, .. } => name,
            Derivation::WeightedSum { name, .. } => name,
        }
    }

    /// Input column names
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            Derivation::Sum { inputs, .. } => inputs.iter().map(|s| s.as_str()).collect(),
            Derivation::YearDiff { later, earlier, .. } => {
                vec![later.as_str(), earlier.as_str()]
            }
            Derivation::WeightedSum { terms, .. } => {
                terms.iter().map(|(c, _)| c.as_str()).collect()
            }
        }
    }
}

/// Applies the configured derivations to a frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureBuilder {
    derivations: Vec<Derivation>,
}

impl FeatureBuilder {
    /// Create a builder from derivation definitions
    pub fn new(derivations: Vec<Derivation>) -> Self {
        Self { derivations }
    }

    /// Append the derived columns to the frame
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut result = df.clone();

        for derivation in &self.derivations {
            let derived = self.derive(&result, derivation)?;
            result = result
                .with_column(derived)
                .map_err(|e| HomepriceError::DataError(e.to_string()))?
                .clone();
        }

        Ok(result)
    }

    /// Output column names, in definition order
    pub fn output_columns(&self) -> Vec<&str> {
        self.derivations.iter().map(|d| d.name()).collect()
    }

    fn derive(&self, df: &DataFrame, derivation: &Derivation) -> Result<Series> {
        let n_rows = df.height();

        let values = match derivation {
            Derivation::Sum { inputs, .. } => {
                let mut acc = vec![0.0f64; n_rows];
                for input in inputs {
                    let col = column_values(df, input)?;
                    for (a, v) in acc.iter_mut().zip(col) {
                        *a += v;
                    }
                }
                acc
            }
            Derivation::YearDiff { later, earlier, .. } => {
                let later = column_values(df, later)?;
                let earlier = column_values(df, earlier)?;
                later
                    .into_iter()
                    .zip(earlier)
                    .map(|(l, e)| (l - e).max(0.0))
                    .collect()
            }
            Derivation::WeightedSum { terms, .. } => {
                let mut acc = vec![0.0f64; n_rows];
                for (input, weight) in terms {
                    let col = column_values(df, input)?;
                    for (a, v) in acc.iter_mut().zip(col) {
                        *a += weight * v;
                    }
                }
                acc
            }
        };

        Ok(Series::new(derivation.name().into(), values))
    }
}

fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let col = df
        .column(name)
        .map_err(|_| HomepriceError::ColumnNotFound(name.to_string()))?;
    let cast = col
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(|e| {
            HomepriceError::PreprocessingError(format!(
                "derivation input {} is not numeric: {}",
                name, e
            ))
        })?;
    let ca = cast
        .f64()
        .map_err(|e| HomepriceError::DataError(e.to_string()))?;
    Ok(ca.into_iter().map(|v| v.unwrap_or(0.0)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_derivation() {
        let df = df!(
            "TotalBsmtSF" => &[800.0, 0.0],
            "1stFlrSF" => &[900.0, 1100.0],
            "2ndFlrSF" => &[700.0, 0.0]
        )
        .unwrap();

        let builder = FeatureBuilder::new(vec![Derivation::sum(
            "TotalSF",
            &["TotalBsmtSF", "1stFlrSF", "2ndFlrSF"],
        )]);
        let result = builder.transform(&df).unwrap();

        let totals: Vec<f64> = result
            .column("TotalSF")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(totals, vec![2400.0, 1100.0]);
    }

    #[test]
    fn test_year_diff_clamped_at_zero() {
        let df = df!(
            "YrSold" => &[2008i64, 2006],
            "YearBuilt" => &[1995i64, 2007]
        )
        .unwrap();

        let builder = FeatureBuilder::new(vec![Derivation::year_diff(
            "HouseAge", "YrSold", "YearBuilt",
        )]);
        let result = builder.transform(&df).unwrap();

        let ages: Vec<f64> = result
            .column("HouseAge")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(ages, vec![13.0, 0.0]);
    }

    #[test]
    fn test_weighted_sum() {
        let df = df!(
            "FullBath" => &[2.0, 1.0],
            "HalfBath" => &[1.0, 0.0]
        )
        .unwrap();

        let builder = FeatureBuilder::new(vec![Derivation::weighted_sum(
            "TotalBath",
            &[("FullBath", 1.0), ("HalfBath", 0.5)],
        )]);
        let result = builder.transform(&df).unwrap();

        let baths: Vec<f64> = result
            .column("TotalBath")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(baths, vec![2.5, 1.0]);
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let df = df!("1stFlrSF" => &[900.0]).unwrap();

        let builder = FeatureBuilder::new(vec![Derivation::sum(
            "TotalSF",
            &["TotalBsmtSF", "1stFlrSF"],
        )]);
        assert!(matches!(
            builder.transform(&df),
            Err(HomepriceError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_derivations_are_deterministic() {
        let df = df!(
            "YrSold" => &[2010i64],
            "YearBuilt" => &[2000i64]
        )
        .unwrap();

        let builder = FeatureBuilder::new(vec![Derivation::year_diff(
            "HouseAge", "YrSold", "YearBuilt",
        )]);
        let a = builder.transform(&df).unwrap();
        let b = builder.transform(&df).unwrap();
        assert!(a.equals(&b));
    }
}
