//! Dataset loading utilities

use crate::error::{HomepriceError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Loader for the delimited train/test datasets
pub struct DatasetLoader {
    infer_schema_length: usize,
    null_values: Vec<String>,
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetLoader {
    /// Create a new loader with default options
    ///
    /// The housing files write missing values as the literal `NA`; without
    /// declaring it a null token, numeric columns infer as strings.
    pub fn new() -> Self {
        Self {
            infer_schema_length: 1000,
            null_values: vec!["NA".to_string()],
        }
    }

    /// Set the number of rows used for schema inference
    pub fn with_infer_schema_length(mut self, n: usize) -> Self {
        self.infer_schema_length = n;
        self
    }

    /// Set the tokens parsed as null
    pub fn with_null_values(mut self, values: Vec<String>) -> Self {
        self.null_values = values;
        self
    }

    /// Load a CSV file into a DataFrame
    ///
    /// A missing or unreadable file is fatal; the pipeline must not proceed
    /// without its inputs.
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            HomepriceError::DataError(format!("cannot open {}: {}", path.display(), e))
        })?;

        let null_tokens: Vec<PlSmallStr> =
            self.null_values.iter().map(|s| s.as_str().into()).collect();
        let parse_opts = CsvParseOptions::default()
            .with_null_values(Some(NullValues::AllColumns(null_tokens)));

        let reader = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file);

        reader
            .finish()
            .map_err(|e| HomepriceError::DataError(format!("{}: {}", path.display(), e)))
    }

    /// Load the training file and verify that the target column is present
    pub fn load_train(&self, path: impl AsRef<Path>, target: &str) -> Result<DataFrame> {
        let df = self.load_csv(path)?;
        require_columns(&df, &[target])?;
        Ok(df)
    }

    /// Load the test file and verify that the id column is present
    pub fn load_test(&self, path: impl AsRef<Path>, id_column: &str) -> Result<DataFrame> {
        let df = self.load_csv(path)?;
        require_columns(&df, &[id_column])?;
        Ok(df)
    }
}

/// Verify that every named column exists in the frame
///
/// Downstream feature engineering depends on a fixed schema, so an absent
/// column is surfaced as an error instead of being silently skipped.
pub fn require_columns(df: &DataFrame, columns: &[&str]) -> Result<()> {
    for name in columns {
        if df.column(name).is_err() {
            return Err(HomepriceError::ColumnNotFound((*name).to_string()));
        }
    }
    Ok(())
}
