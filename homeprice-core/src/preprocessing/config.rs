//! Preprocessing configuration

use super::features::Derivation;
use super::imputer::ImputeStrategy;
use serde::{Deserialize, Serialize};

/// Fixed rank order for an ordinal categorical column
///
/// Position in `levels` is the encoded integer, lowest rank first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdinalSpec {
    pub column: String,
    pub levels: Vec<String>,
}

impl OrdinalSpec {
    pub fn new(column: impl Into<String>, levels: &[&str]) -> Self {
        Self {
            column: column.into(),
            levels: levels.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Configuration for the preprocessing pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Target column name; never imputed, clipped, or encoded
    pub target_column: String,

    /// Row identifier column; carried through untouched and dropped from
    /// the feature matrix
    pub id_column: String,

    /// Imputation strategy for numeric columns
    pub numeric_impute: ImputeStrategy,

    /// Imputation strategy for categorical columns
    pub categorical_impute: ImputeStrategy,

    /// Categorical columns with more unique values than this are left to
    /// the encoder's all-zero fallback instead of being imputed
    pub categorical_impute_max_cardinality: usize,

    /// Per-column strategy overrides (absence-implies-none columns)
    pub impute_overrides: Vec<(String, ImputeStrategy)>,

    /// Lower quantile for the asymmetric IQR outlier bounds
    pub outlier_low_quantile: f64,

    /// Upper quantile for the asymmetric IQR outlier bounds
    pub outlier_up_quantile: f64,

    /// IQR multiplier
    pub outlier_factor: f64,

    /// Columns to winsorize; `None` means every numeric feature column
    pub outlier_clip_columns: Option<Vec<String>>,

    /// Key columns whose out-of-bounds rows are removed from TRAINING data
    /// only; test rows are never dropped
    pub outlier_remove_columns: Vec<String>,

    /// Categories rarer than this training frequency collapse into "Rare";
    /// 0.0 disables grouping
    pub rare_threshold: f64,

    /// Ordinal columns with their fixed rank orders
    pub ordinal_levels: Vec<OrdinalSpec>,

    /// Derived feature definitions
    pub derivations: Vec<Derivation>,

    /// Non-predictive columns dropped from the feature matrix
    pub drop_columns: Vec<String>,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            target_column: "SalePrice".to_string(),
            id_column: "Id".to_string(),
            numeric_impute: ImputeStrategy::Median,
            categorical_impute: ImputeStrategy::Mode,
            categorical_impute_max_cardinality: 17,
            impute_overrides: Vec::new(),
            outlier_low_quantile: 0.10,
            outlier_up_quantile: 0.90,
            outlier_factor: 1.5,
            outlier_clip_columns: None,
            outlier_remove_columns: Vec::new(),
            rare_threshold: 0.01,
            ordinal_levels: Vec::new(),
            derivations: Vec::new(),
            drop_columns: Vec::new(),
        }
    }
}

impl PreprocessingConfig {
    /// Create a configuration with defaults and no schema-specific rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile for the Ames housing schema: absence-implies-none fills,
    /// quality rank orders, derived area/age/quality features.
    pub fn ames_housing() -> Self {
        let quality = &["None", "Po", "Fa", "TA", "Gd", "Ex"];

        let zero_fill = [
            "GarageArea",
            "GarageCars",
            "GarageYrBlt",
            "TotalBsmtSF",
            "BsmtFinSF1",
            "BsmtFinSF2",
            "BsmtUnfSF",
            "BsmtFullBath",
            "BsmtHalfBath",
            "MasVnrArea",
        ];
        let none_fill = [
            "Alley",
            "MasVnrType",
            "BsmtQual",
            "BsmtCond",
            "BsmtExposure",
            "BsmtFinType1",
            "BsmtFinType2",
            "FireplaceQu",
            "GarageType",
            "GarageFinish",
            "GarageQual",
            "GarageCond",
            "PoolQC",
            "Fence",
            "MiscFeature",
        ];

        let mut overrides: Vec<(String, ImputeStrategy)> = Vec::new();
        for col in zero_fill {
            overrides.push((col.to_string(), ImputeStrategy::Zero));
        }
        for col in none_fill {
            overrides.push((
                col.to_string(),
                ImputeStrategy::ConstantString("None".to_string()),
            ));
        }

        let mut ordinal_levels = vec![
            OrdinalSpec::new("BsmtExposure", &["None", "No", "Mn", "Av", "Gd"]),
            OrdinalSpec::new(
                "BsmtFinType1",
                &["None", "Unf", "LwQ", "Rec", "BLQ", "ALQ", "GLQ"],
            ),
            OrdinalSpec::new(
                "BsmtFinType2",
                &["None", "Unf", "LwQ", "Rec", "BLQ", "ALQ", "GLQ"],
            ),
            OrdinalSpec::new(
                "Functional",
                &["Sal", "Sev", "Maj2", "Maj1", "Mod", "Min2", "Min1", "Typ"],
            ),
            OrdinalSpec::new("GarageFinish", &["None", "Unf", "RFn", "Fin"]),
            OrdinalSpec::new("CentralAir", &["N", "Y"]),
            OrdinalSpec::new("PavedDrive", &["N", "P", "Y"]),
        ];
        for col in [
            "ExterQual",
            "ExterCond",
            "BsmtQual",
            "BsmtCond",
            "HeatingQC",
            "KitchenQual",
            "FireplaceQu",
            "GarageQual",
            "GarageCond",
            "PoolQC",
        ] {
            ordinal_levels.push(OrdinalSpec::new(col, quality));
        }

        let derivations = vec![
            Derivation::sum("TotalSF", &["TotalBsmtSF", "1stFlrSF", "2ndFlrSF"]),
            Derivation::sum(
                "TotalPorchSF",
                &[
                    "WoodDeckSF",
                    "OpenPorchSF",
                    "EnclosedPorch",
                    "3SsnPorch",
                    "ScreenPorch",
                ],
            ),
            Derivation::weighted_sum(
                "TotalBath",
                &[
                    ("FullBath", 1.0),
                    ("HalfBath", 0.5),
                    ("BsmtFullBath", 1.0),
                    ("BsmtHalfBath", 0.5),
                ],
            ),
            Derivation::year_diff("HouseAge", "YrSold", "YearBuilt"),
            Derivation::year_diff("RemodAge", "YrSold", "YearRemodAdd"),
            Derivation::weighted_sum(
                "QualityScore",
                &[
                    ("OverallQual", 2.0),
                    ("ExterQual", 2.0),
                    ("KitchenQual", 2.0),
                    ("BsmtQual", 1.0),
                    ("HeatingQC", 1.0),
                    ("GarageQual", 1.0),
                ],
            ),
        ];

        Self {
            impute_overrides: overrides,
            outlier_remove_columns: vec!["GrLivArea".to_string(), "LotArea".to_string()],
            ordinal_levels,
            derivations,
            drop_columns: vec![
                "Id".to_string(),
                "Street".to_string(),
                "Utilities".to_string(),
            ],
            ..Self::default()
        }
    }

    /// Builder method to set the target column
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }

    /// Builder method to set the id column
    pub fn with_id_column(mut self, id: impl Into<String>) -> Self {
        self.id_column = id.into();
        self
    }

    /// Builder method to set the numeric imputation strategy
    pub fn with_numeric_impute(mut self, strategy: ImputeStrategy) -> Self {
        self.numeric_impute = strategy;
        self
    }

    /// Builder method to set the rare-category threshold
    pub fn with_rare_threshold(mut self, threshold: f64) -> Self {
        self.rare_threshold = threshold;
        self
    }

    /// Builder method to add an ordinal rank order
    pub fn with_ordinal(mut self, spec: OrdinalSpec) -> Self {
        self.ordinal_levels.push(spec);
        self
    }

    /// Builder method to add a derived feature
    pub fn with_derivation(mut self, derivation: Derivation) -> Self {
        self.derivations.push(derivation);
        self
    }

    /// Builder method to add dropped columns
    pub fn with_drop_columns(mut self, columns: Vec<String>) -> Self {
        self.drop_columns = columns;
        self
    }

    /// Builder method to set key columns for training-row outlier removal
    pub fn with_outlier_removal(mut self, columns: Vec<String>) -> Self {
        self.outlier_remove_columns = columns;
        self
    }
}
