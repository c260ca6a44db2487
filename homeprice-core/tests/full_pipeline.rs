//! Integration test: full pipeline (load -> preprocess -> train -> predict -> export)

use homeprice_core::data::DatasetLoader;
use homeprice_core::pipeline::PricePipeline;
use homeprice_core::preprocessing::{Derivation, OrdinalSpec, PreprocessingConfig};
use homeprice_core::training::{KFold, TrainingConfig};
use polars::prelude::*;
use std::collections::HashSet;

fn create_train_frame() -> DataFrame {
    df!(
        "Id" => &[1i64, 2, 3, 4, 5, 6, 7, 8, 9, 10],
        "GrLivArea" => &[Some(900.0), Some(1100.0), None, Some(1500.0), Some(1250.0),
                        Some(1700.0), Some(1400.0), Some(1000.0), Some(1850.0), Some(1600.0)],
        "YrSold" => &[2008i64, 2007, 2008, 2009, 2008, 2007, 2009, 2008, 2007, 2009],
        "YearBuilt" => &[1995i64, 2001, 1980, 2005, 1999, 1990, 2003, 1985, 2006, 2000],
        "KitchenQual" => &["TA", "Gd", "TA", "Ex", "Gd", "TA", "Gd", "TA", "Ex", "Gd"],
        "Neighborhood" => &["CollgCr", "Veenker", "CollgCr", "Mitchel", "CollgCr",
                           "Veenker", "Mitchel", "CollgCr", "Veenker", "Mitchel"],
        "SalePrice" => &[118000.0, 151000.0, 125000.0, 230000.0, 172000.0,
                        163000.0, 195000.0, 119500.0, 248000.0, 192000.0]
    )
    .unwrap()
}

fn create_test_frame() -> DataFrame {
    df!(
        "Id" => &[11i64, 12, 13],
        "GrLivArea" => &[Some(1200.0), None, Some(1650.0)],
        "YrSold" => &[2010i64, 2010, 2010],
        "YearBuilt" => &[2002i64, 1998, 2008],
        "KitchenQual" => &["Gd", "TA", "Ex"],
        // "Atlantis" never appears in training data.
        "Neighborhood" => &["CollgCr", "Atlantis", "Veenker"]
    )
    .unwrap()
}

fn preprocessing_config() -> PreprocessingConfig {
    PreprocessingConfig::new()
        .with_ordinal(OrdinalSpec::new(
            "KitchenQual",
            &["None", "Po", "Fa", "TA", "Gd", "Ex"],
        ))
        .with_derivation(Derivation::year_diff("HouseAge", "YrSold", "YearBuilt"))
        .with_rare_threshold(0.0)
}

fn training_config() -> TrainingConfig {
    TrainingConfig::new("SalePrice")
        .with_n_estimators(60)
        .with_learning_rate(0.2)
        .with_max_depth(3)
        .with_min_samples_leaf(1)
        .with_cv(2)
}

#[test]
fn test_end_to_end_synthetic_run() {
    let train = create_train_frame();
    let test = create_test_frame();

    let run = PricePipeline::new(preprocessing_config(), training_config())
        .run(&train, &test)
        .unwrap();

    // Exactly one output row per test row, ids in input order.
    assert_eq!(run.submission.len(), 3);
    assert_eq!(run.submission.ids(), &[11, 12, 13]);

    // The unseen-category row predicts without error, and every price is a
    // plausible finite positive number.
    for &price in run.submission.predictions() {
        assert!(price.is_finite());
        assert!(price > 0.0);
    }

    // Metrics and importances exist on the de-logged price scale.
    assert!(run.metrics.cv_rmse.is_finite());
    assert!(run.metrics.rmse > 0.0);
    assert_eq!(run.metrics.cv_scores.len(), 2);
    assert!(!run.importances.is_empty());
}

#[test]
fn test_submission_file_round_trip() {
    let train = create_train_frame();
    let test = create_test_frame();

    let run = PricePipeline::new(preprocessing_config(), training_config())
        .run(&train, &test)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("submission.csv");
    run.submission.write_csv(&path).unwrap();

    let reloaded = DatasetLoader::new().load_csv(&path).unwrap();
    assert_eq!(reloaded.height(), 3);
    assert_eq!(reloaded.width(), 2);

    let ids: Vec<i64> = reloaded
        .column("Id")
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(ids, vec![11, 12, 13]);
}

#[test]
fn test_test_data_never_influences_training() {
    let train = create_train_frame();
    let test_a = create_test_frame();

    // Same schema, wildly different values.
    let test_b = df!(
        "Id" => &[11i64, 12, 13, 14],
        "GrLivArea" => &[Some(1200.0), None, Some(1650.0), Some(999_999.0)],
        "YrSold" => &[2010i64, 2010, 2010, 2030],
        "YearBuilt" => &[2002i64, 1998, 2008, 1800],
        "KitchenQual" => &["Gd", "TA", "Ex", "Po"],
        "Neighborhood" => &["CollgCr", "Atlantis", "Veenker", "Nowhere"]
    )
    .unwrap();

    let run_a = PricePipeline::new(preprocessing_config(), training_config())
        .run(&train, &test_a)
        .unwrap();
    let run_b = PricePipeline::new(preprocessing_config(), training_config())
        .run(&train, &test_b)
        .unwrap();

    // Fitted statistics come from training data alone, so the shared test
    // rows score identically no matter what else sits in the test frame.
    assert_eq!(
        run_a.submission.predictions(),
        &run_b.submission.predictions()[..3]
    );
}

#[test]
fn test_folds_partition_training_rows() {
    let folds = KFold::new(5).with_seed(42).split(50).unwrap();

    let mut seen: HashSet<usize> = HashSet::new();
    for (train_idx, val_idx) in &folds {
        // Disjoint within a fold.
        let train_set: HashSet<usize> = train_idx.iter().copied().collect();
        assert!(val_idx.iter().all(|i| !train_set.contains(i)));
        // Exhaustive and non-overlapping across folds.
        for &i in val_idx {
            assert!(seen.insert(i), "row {} validated twice", i);
        }
    }
    assert_eq!(seen.len(), 50);
}

#[test]
fn test_encoding_is_stable_under_row_reordering() {
    let train = create_train_frame();
    let reversed = train.reverse();

    let mut pre_a = homeprice_core::preprocessing::DataPreprocessor::with_config(
        preprocessing_config(),
    );
    pre_a.fit(&train).unwrap();
    let mut pre_b = homeprice_core::preprocessing::DataPreprocessor::with_config(
        preprocessing_config(),
    );
    pre_b.fit(&reversed).unwrap();

    // Same feature columns in the same order regardless of row order.
    assert_eq!(pre_a.feature_columns(), pre_b.feature_columns());

    // And a fixed probe row encodes identically under both fits.
    let probe = create_test_frame();
    let out_a = pre_a.transform(&probe).unwrap();
    let out_b = pre_b.transform(&probe).unwrap();
    assert!(out_a.equals(&out_b));
}

#[test]
fn test_missing_training_file_is_fatal() {
    let loader = DatasetLoader::new();
    assert!(loader.load_train("/no/such/train.csv", "SalePrice").is_err());
}

#[test]
fn test_schema_mismatch_is_surfaced() {
    let train = create_train_frame();
    let test = create_test_frame();

    // Demand a derivation input the data does not have.
    let config = preprocessing_config()
        .with_derivation(Derivation::sum("TotalSF", &["TotalBsmtSF", "GrLivArea"]));

    let result = PricePipeline::new(config, training_config()).run(&train, &test);
    assert!(result.is_err());
}
