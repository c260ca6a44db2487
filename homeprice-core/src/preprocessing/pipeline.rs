//! Data preprocessing pipeline
//!
//! Orchestrates the cleaning and feature-engineering stages:
//! impute -> (train-only outlier row removal) -> winsorize -> ordinal
//! encode -> rare grouping -> derived features -> one-hot encode -> select.
//!
//! Every fitted statistic comes from the training frame; `transform` applies
//! the frozen state to any frame with the same schema.

use crate::error::{HomepriceError, Result};
use super::{
    config::PreprocessingConfig,
    encoder::{OneHotEncoder, OrdinalEncoder, RareGrouper},
    features::FeatureBuilder,
    imputer::Imputer,
    outlier::OutlierHandler,
    selector::FeatureSelector,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Main data preprocessing pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPreprocessor {
    config: PreprocessingConfig,
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    nominal_columns: Vec<String>,
    imputer: Option<Imputer>,
    outliers: Option<OutlierHandler>,
    ordinal: Option<OrdinalEncoder>,
    rare: Option<RareGrouper>,
    features: FeatureBuilder,
    onehot: Option<OneHotEncoder>,
    selector: FeatureSelector,
    feature_columns: Vec<String>,
    is_fitted: bool,
}

impl DataPreprocessor {
    /// Create a preprocessor with default configuration
    pub fn new() -> Self {
        Self::with_config(PreprocessingConfig::default())
    }

    /// Create a preprocessor with custom configuration
    pub fn with_config(config: PreprocessingConfig) -> Self {
        let features = FeatureBuilder::new(config.derivations.clone());

        // The id column never belongs in the feature matrix.
        let mut drop_columns = config.drop_columns.clone();
        if !drop_columns.contains(&config.id_column) {
            drop_columns.push(config.id_column.clone());
        }
        let selector = FeatureSelector::new(drop_columns);

        Self {
            config,
            numeric_columns: Vec::new(),
            categorical_columns: Vec::new(),
            nominal_columns: Vec::new(),
            imputer: None,
            outliers: None,
            ordinal: None,
            rare: None,
            features,
            onehot: None,
            selector,
            feature_columns: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit every stage from the training frame
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        self.detect_column_types(df);
        self.rare = None;

        // Imputation
        let mut imputer = Imputer::new(
            self.config.numeric_impute.clone(),
            self.config.categorical_impute.clone(),
        )
        .with_max_categorical_cardinality(self.config.categorical_impute_max_cardinality)
        .with_overrides(&self.config.impute_overrides)
        .with_skip_columns(vec![
            self.config.target_column.clone(),
            self.config.id_column.clone(),
        ]);
        imputer.fit(df)?;
        let imputed = imputer.transform(df)?;
        self.imputer = Some(imputer);

        // Outlier bounds over the clip columns plus the removal keys
        let mut outlier_columns = match &self.config.outlier_clip_columns {
            Some(cols) => cols.clone(),
            None => self.numeric_columns.clone(),
        };
        for col in &self.config.outlier_remove_columns {
            if !outlier_columns.contains(col) {
                outlier_columns.push(col.clone());
            }
        }
        let mut outliers = OutlierHandler::new(
            self.config.outlier_low_quantile,
            self.config.outlier_up_quantile,
            self.config.outlier_factor,
        )
        .with_columns(outlier_columns);
        outliers.fit(&imputed)?;
        let clipped = outliers.transform(&imputed)?;
        self.outliers = Some(outliers);

        // Ordinal encoding with configured rank orders
        let mut ordinal = OrdinalEncoder::new(self.config.ordinal_levels.clone());
        ordinal.fit(&clipped)?;
        let encoded = ordinal.transform(&clipped)?;
        self.ordinal = Some(ordinal);

        // Rare grouping over nominal columns
        let grouped = if self.config.rare_threshold > 0.0 && !self.nominal_columns.is_empty() {
            let mut rare = RareGrouper::new(self.config.rare_threshold);
            rare.fit(&encoded, &self.nominal_columns)?;
            let grouped = rare.transform(&encoded)?;
            self.rare = Some(rare);
            grouped
        } else {
            encoded
        };

        // Derived features
        let derived = self.features.transform(&grouped)?;

        // One-hot with a training-frozen vocabulary
        let mut onehot = OneHotEncoder::new();
        onehot.fit(&derived, &self.nominal_columns)?;
        let expanded = onehot.transform(&derived)?;
        self.onehot = Some(onehot);

        // Column selection and the final feature list
        let selected = self.selector.transform(&expanded)?;
        self.feature_columns = selected
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|name| name != &self.config.target_column)
            .collect();

        self.is_fitted = true;
        tracing::debug!(
            n_features = self.feature_columns.len(),
            n_numeric = self.numeric_columns.len(),
            n_categorical = self.categorical_columns.len(),
            "preprocessor fitted"
        );
        Ok(self)
    }

    /// Apply the fitted stages to a frame without removing rows
    ///
    /// Used for the test frame, where every row must survive to prediction.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        self.run_stages(df, false)
    }

    /// Fit on the training frame, then transform it with outlier rows removed
    pub fn fit_transform_train(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.run_stages(df, true)
    }

    /// Final feature column names, in output order
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// Detected numeric column names
    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    /// Detected categorical column names
    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    /// Pipeline configuration
    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    /// Save the fitted preprocessor to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a fitted preprocessor from a file
    pub fn load(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let preprocessor: Self = serde_json::from_str(&json)?;
        Ok(preprocessor)
    }

    fn run_stages(&self, df: &DataFrame, remove_outlier_rows: bool) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(HomepriceError::NotFitted);
        }

        let imputer = self.imputer.as_ref().ok_or(HomepriceError::NotFitted)?;
        let outliers = self.outliers.as_ref().ok_or(HomepriceError::NotFitted)?;
        let ordinal = self.ordinal.as_ref().ok_or(HomepriceError::NotFitted)?;
        let onehot = self.onehot.as_ref().ok_or(HomepriceError::NotFitted)?;

        let mut result = imputer.transform(df)?;

        // Removal must precede winsorizing: clipped values are in-bounds by
        // construction and would never be filtered.
        if remove_outlier_rows && !self.config.outlier_remove_columns.is_empty() {
            let before = result.height();
            result = outliers.filter_rows(&result, &self.config.outlier_remove_columns)?;
            let removed = before - result.height();
            if removed > 0 {
                tracing::info!(removed, "dropped outlier rows from training data");
            }
        }

        result = outliers.transform(&result)?;
        result = ordinal.transform(&result)?;
        if let Some(rare) = &self.rare {
            result = rare.transform(&result)?;
        }
        result = self.features.transform(&result)?;
        result = onehot.transform(&result)?;
        result = self.selector.transform(&result)?;

        // Fixed output order; the target tags along on training frames.
        let mut columns = self.feature_columns.clone();
        if result.column(&self.config.target_column).is_ok() {
            columns.push(self.config.target_column.clone());
        }
        result
            .select(columns)
            .map_err(|e| HomepriceError::DataError(e.to_string()))
    }

    fn detect_column_types(&mut self, df: &DataFrame) {
        self.numeric_columns.clear();
        self.categorical_columns.clear();

        let ordinal_columns: Vec<&str> = self
            .config
            .ordinal_levels
            .iter()
            .map(|s| s.column.as_str())
            .collect();

        for col in df.get_columns() {
            let name = col.name().to_string();
            if name == self.config.target_column || name == self.config.id_column {
                continue;
            }

            if col.dtype().is_primitive_numeric() {
                self.numeric_columns.push(name);
            } else if col.dtype() == &DataType::String {
                self.categorical_columns.push(name);
            }
        }

        self.nominal_columns = self
            .categorical_columns
            .iter()
            .filter(|name| !ordinal_columns.contains(&name.as_str()))
            .cloned()
            .collect();
    }
}

impl Default for DataPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::config::OrdinalSpec;
    use crate::preprocessing::features::Derivation;

    fn create_train_frame() -> DataFrame {
        df!(
            "Id" => &[1i64, 2, 3, 4, 5, 6],
            "LotArea" => &[Some(8450.0), Some(9600.0), None, Some(10500.0), Some(9200.0), Some(8800.0)],
            "YrSold" => &[2008i64, 2007, 2008, 2009, 2008, 2007],
            "YearBuilt" => &[1995i64, 2001, 1980, 2005, 1999, 1990],
            "ExterQual" => &["TA", "Gd", "TA", "Ex", "Gd", "TA"],
            "Neighborhood" => &["CollgCr", "Veenker", "CollgCr", "CollgCr", "Veenker", "CollgCr"],
            "SalePrice" => &[208500.0, 181500.0, 140000.0, 250000.0, 196500.0, 155000.0]
        )
        .unwrap()
    }

    fn create_config() -> PreprocessingConfig {
        PreprocessingConfig::new()
            .with_ordinal(OrdinalSpec::new(
                "ExterQual",
                &["None", "Po", "Fa", "TA", "Gd", "Ex"],
            ))
            .with_derivation(Derivation::year_diff("HouseAge", "YrSold", "YearBuilt"))
            .with_rare_threshold(0.0)
    }

    #[test]
    fn test_fit_transform_produces_numeric_features() {
        let df = create_train_frame();
        let mut preprocessor = DataPreprocessor::with_config(create_config());
        let result = preprocessor.fit_transform_train(&df).unwrap();

        // Id is withheld from the feature matrix.
        assert!(result.column("Id").is_err());
        // Derived and one-hot columns exist.
        assert!(result.column("HouseAge").is_ok());
        assert!(result.column("Neighborhood_CollgCr").is_ok());
        // The nominal original is gone.
        assert!(result.column("Neighborhood").is_err());
        // Target survives on the training frame.
        assert!(result.column("SalePrice").is_ok());
        // Imputation leaves no nulls in fitted columns.
        assert_eq!(result.column("LotArea").unwrap().null_count(), 0);
    }

    #[test]
    fn test_transform_aligns_test_frame() {
        let train = create_train_frame();
        let mut preprocessor = DataPreprocessor::with_config(create_config());
        preprocessor.fit_transform_train(&train).unwrap();

        let test = df!(
            "Id" => &[7i64, 8],
            "LotArea" => &[Some(9000.0), None],
            "YrSold" => &[2010i64, 2010],
            "YearBuilt" => &[2000i64, 1985],
            "ExterQual" => &["Gd", "Fa"],
            // "Somewhere" was never seen in training.
            "Neighborhood" => &["CollgCr", "Somewhere"]
        )
        .unwrap();

        let result = preprocessor.transform(&test).unwrap();

        assert_eq!(result.height(), 2);
        let expected: Vec<&str> = preprocessor
            .feature_columns()
            .iter()
            .map(|s| s.as_str())
            .collect();
        let actual: Vec<String> = result
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(actual, expected);

        // Unseen category encodes as all-zero indicators.
        let veenker: Vec<i32> = result
            .column("Neighborhood_Veenker")
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        let collgcr: Vec<i32> = result
            .column("Neighborhood_CollgCr")
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(veenker, vec![0, 0]);
        assert_eq!(collgcr, vec![1, 0]);
    }

    #[test]
    fn test_test_rows_never_removed() {
        let train = create_train_frame();
        let config = create_config()
            .with_outlier_removal(vec!["LotArea".to_string()]);
        let mut preprocessor = DataPreprocessor::with_config(config);
        preprocessor.fit_transform_train(&train).unwrap();

        // An absurd test row stays: it is clipped, not dropped.
        let test = df!(
            "Id" => &[7i64],
            "LotArea" => &[900_000.0],
            "YrSold" => &[2010i64],
            "YearBuilt" => &[2000i64],
            "ExterQual" => &["Gd"],
            "Neighborhood" => &["CollgCr"]
        )
        .unwrap();

        let result = preprocessor.transform(&test).unwrap();
        assert_eq!(result.height(), 1);
    }

    #[test]
    fn test_no_leakage_from_test_frame() {
        let train = create_train_frame();
        let mut preprocessor = DataPreprocessor::with_config(create_config());
        let processed_train = preprocessor.fit_transform_train(&train).unwrap();

        // Transforming wildly different test data must not change what the
        // fitted pipeline does to training rows.
        let test = df!(
            "Id" => &[7i64],
            "LotArea" => &[1e9],
            "YrSold" => &[2010i64],
            "YearBuilt" => &[2000i64],
            "ExterQual" => &["Gd"],
            "Neighborhood" => &["Elsewhere"]
        )
        .unwrap();
        preprocessor.transform(&test).unwrap();

        let again = preprocessor.transform(&train).unwrap();
        let train_features = processed_train
            .select(
                preprocessor
                    .feature_columns()
                    .iter()
                    .map(|s| s.to_string()),
            )
            .unwrap();
        assert!(train_features.equals(&again.select(
            preprocessor.feature_columns().iter().map(|s| s.to_string())
        )
        .unwrap()));
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let df = create_train_frame();
        let preprocessor = DataPreprocessor::new();
        assert!(matches!(
            preprocessor.transform(&df),
            Err(HomepriceError::NotFitted)
        ));
    }
}
