//! Submission file construction

use crate::error::{HomepriceError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Two-column prediction output: one row per test row, input order preserved
#[derive(Debug, Clone)]
pub struct Submission {
    id_column: String,
    price_column: String,
    ids: Vec<i64>,
    predictions: Vec<f64>,
}

impl Submission {
    /// Build a submission from parallel id/prediction vectors
    ///
    /// Every prediction must be finite: a NaN or infinite price would
    /// otherwise be dropped or mangled downstream, breaking the
    /// one-row-per-input contract, so it is reported here instead.
    pub fn new(
        id_column: impl Into<String>,
        price_column: impl Into<String>,
        ids: Vec<i64>,
        predictions: Vec<f64>,
    ) -> Result<Self> {
        if ids.len() != predictions.len() {
            return Err(HomepriceError::ShapeError {
                expected: format!("{} predictions", ids.len()),
                actual: format!("{}", predictions.len()),
            });
        }

        for (row, value) in predictions.iter().enumerate() {
            if !value.is_finite() {
                return Err(HomepriceError::DataError(format!(
                    "non-finite prediction {} at row {} (id {})",
                    value, row, ids[row]
                )));
            }
        }

        Ok(Self {
            id_column: id_column.into(),
            price_column: price_column.into(),
            ids,
            predictions,
        })
    }

    /// Number of prediction rows
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if the submission is empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Row identifiers, in test-file order
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// Predicted prices, aligned with `ids`
    pub fn predictions(&self) -> &[f64] {
        &self.predictions
    }

    /// Convert to a two-column DataFrame
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        DataFrame::new(vec![
            Series::new(self.id_column.as_str().into(), &self.ids).into(),
            Series::new(self.price_column.as_str().into(), &self.predictions).into(),
        ])
        .map_err(|e| HomepriceError::DataError(e.to_string()))
    }

    /// Write the submission as CSV
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut df = self.to_dataframe()?;
        let mut file = File::create(path.as_ref())
            .map_err(|e| HomepriceError::DataError(e.to_string()))?;

        CsvWriter::new(&mut file)
            .finish(&mut df)
            .map_err(|e| HomepriceError::DataError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DatasetLoader;
    use tempfile::NamedTempFile;

    #[test]
    fn test_submission_preserves_order() {
        let sub = Submission::new(
            "Id",
            "SalePrice",
            vec![1461, 1462, 1463],
            vec![120_000.0, 155_500.0, 180_250.0],
        )
        .unwrap();

        assert_eq!(sub.len(), 3);
        assert_eq!(sub.ids(), &[1461, 1462, 1463]);

        let df = sub.to_dataframe().unwrap();
        let ids: Vec<i64> = df
            .column("Id")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(ids, vec![1461, 1462, 1463]);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let result = Submission::new("Id", "SalePrice", vec![1, 2], vec![100.0]);
        assert!(matches!(
            result,
            Err(HomepriceError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_non_finite_prediction_rejected() {
        let result = Submission::new("Id", "SalePrice", vec![1, 2], vec![100.0, f64::NAN]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_write_and_reload() {
        let sub = Submission::new("Id", "SalePrice", vec![1, 2], vec![100.0, 200.0]).unwrap();

        let file = NamedTempFile::new().unwrap();
        sub.write_csv(file.path()).unwrap();

        let df = DatasetLoader::new().load_csv(file.path()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 2);
        assert!(df.column("SalePrice").is_ok());
    }
}
