//! Homeprice CLI
//!
//! Command-line interface for the house-price regression pipeline:
//! training, prediction, and the single-command train-to-submission run.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

use homeprice_core::data::DatasetLoader;
use homeprice_core::inference::{InferenceConfig, InferenceEngine};
use homeprice_core::optimizer::ParamGrid;
use homeprice_core::pipeline::PricePipeline;
use homeprice_core::preprocessing::{DataPreprocessor, PreprocessingConfig};
use homeprice_core::training::{TrainEngine, TrainingConfig};

#[derive(Parser)]
#[command(name = "homeprice")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "House-price regression pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: train, validate, predict, write submission
    Run {
        /// Training data file (CSV, target column present)
        #[arg(long)]
        train: PathBuf,

        /// Test data file (CSV, target column absent)
        #[arg(long)]
        test: PathBuf,

        /// Output submission file
        #[arg(short, long, default_value = "submission.csv")]
        output: PathBuf,

        /// Target column name
        #[arg(long, default_value = "SalePrice")]
        target: String,

        /// Row identifier column name
        #[arg(long, default_value = "Id")]
        id_column: String,

        /// Preprocessing profile (ames, plain)
        #[arg(long, default_value = "ames")]
        profile: String,

        /// Grid-search hyperparameters before the final fit
        #[arg(long)]
        grid: bool,
    },

    /// Train a model and save it
    Train {
        /// Training data file
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long, default_value = "SalePrice")]
        target: String,

        /// Preprocessing profile (ames, plain)
        #[arg(long, default_value = "ames")]
        profile: String,

        /// Output model file
        #[arg(short, long, default_value = "model.json")]
        output: PathBuf,

        /// Output preprocessor file
        #[arg(long, default_value = "preprocessor.json")]
        preprocessor: PathBuf,
    },

    /// Make predictions using a trained model
    Predict {
        /// Trained model file
        #[arg(short, long)]
        model: PathBuf,

        /// Fitted preprocessor file
        #[arg(long)]
        preprocessor: Option<PathBuf>,

        /// Test data file
        #[arg(short, long)]
        data: PathBuf,

        /// Output submission file
        #[arg(short, long, default_value = "submission.csv")]
        output: PathBuf,

        /// Row identifier column name
        #[arg(long, default_value = "Id")]
        id_column: String,
    },

    /// Show data information
    Info {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "homeprice=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            train,
            test,
            output,
            target,
            id_column,
            profile,
            grid,
        } => cmd_run(&train, &test, &output, &target, &id_column, &profile, grid)?,
        Commands::Train {
            data,
            target,
            profile,
            output,
            preprocessor,
        } => cmd_train(&data, &target, &profile, &output, &preprocessor)?,
        Commands::Predict {
            model,
            preprocessor,
            data,
            output,
            id_column,
        } => cmd_predict(&model, preprocessor.as_deref(), &data, &output, &id_column)?,
        Commands::Info { data } => cmd_info(&data)?,
    }

    Ok(())
}

fn preprocessing_config(profile: &str, target: &str, id_column: &str) -> anyhow::Result<PreprocessingConfig> {
    let config = match profile {
        "ames" => PreprocessingConfig::ames_housing(),
        "plain" => PreprocessingConfig::new(),
        _ => anyhow::bail!("Invalid profile: {}", profile),
    };
    Ok(config.with_target(target).with_id_column(id_column))
}

fn cmd_run(
    train_path: &PathBuf,
    test_path: &PathBuf,
    output: &PathBuf,
    target: &str,
    id_column: &str,
    profile: &str,
    grid: bool,
) -> anyhow::Result<()> {
    println!("{}", "Homeprice - Full Pipeline".blue().bold());
    println!();

    let loader = DatasetLoader::new();

    print!("Loading training data... ");
    let start = Instant::now();
    let train = loader.load_train(train_path, target)?;
    println!(
        "{} ({} rows x {} cols in {:?})",
        "ok".green(),
        train.height(),
        train.width(),
        start.elapsed()
    );

    print!("Loading test data... ");
    let test = loader.load_test(test_path, id_column)?;
    println!("{} ({} rows x {} cols)", "ok".green(), test.height(), test.width());

    let preprocessing = preprocessing_config(profile, target, id_column)?;
    let training = TrainingConfig::new(target);

    let mut pipeline = PricePipeline::new(preprocessing, training);
    if grid {
        pipeline = pipeline.with_grid(ParamGrid::default());
    }

    print!("Training{}... ", if grid { " with grid search" } else { "" });
    let start = Instant::now();
    let run = pipeline.run(&train, &test)?;
    println!("{} ({:?})", "ok".green(), start.elapsed());

    println!();
    println!("{}", "Results".yellow().bold());
    println!("{}", "-".repeat(45));
    println!("CV RMSE:      {:.2}", run.metrics.cv_rmse);
    println!("CV RMSE(log): {:.5}", run.metrics.rmse_log);
    println!("MAE:          {:.2}", run.metrics.mae);
    println!("R2:           {:.4}", run.metrics.r2);
    println!("Features:     {}", run.metrics.n_features);
    println!("Train rows:   {}", run.metrics.n_samples);

    if let Some(best) = &run.best_trial {
        println!();
        println!("{}", "Best configuration".yellow().bold());
        println!("{}", "-".repeat(45));
        println!("learning_rate:    {}", best.point.learning_rate);
        println!("max_depth:        {}", best.point.max_depth);
        println!("n_estimators:     {}", best.point.n_estimators);
        println!("min_samples_leaf: {}", best.point.min_samples_leaf);
    }

    println!();
    println!("{}", "Top features by gain".yellow().bold());
    println!("{}", "-".repeat(45));
    for (name, share) in run.importances.iter().take(15) {
        println!("{:<30} {:>8.4}", name, share);
    }

    print!("\nWriting {}... ", output.display());
    run.submission.write_csv(output)?;
    println!("{} ({} rows)", "ok".green(), run.submission.len());

    Ok(())
}

fn cmd_train(
    data_path: &PathBuf,
    target: &str,
    profile: &str,
    model_out: &PathBuf,
    preprocessor_out: &PathBuf,
) -> anyhow::Result<()> {
    println!("{}", "Homeprice - Training".blue().bold());
    println!();

    let loader = DatasetLoader::new();

    print!("Loading data... ");
    let df = loader.load_train(data_path, target)?;
    println!("{} ({} rows x {} cols)", "ok".green(), df.height(), df.width());

    let config = preprocessing_config(profile, target, "Id")?;
    let mut preprocessor = DataPreprocessor::with_config(config);

    print!("Preprocessing... ");
    let start = Instant::now();
    let processed = preprocessor.fit_transform_train(&df)?;
    println!(
        "{} ({} rows x {} cols in {:?})",
        "ok".green(),
        processed.height(),
        processed.width(),
        start.elapsed()
    );

    print!("Training... ");
    let start = Instant::now();
    let mut engine = TrainEngine::new(TrainingConfig::new(target));
    engine.fit(&processed)?;
    println!("{} ({:?})", "ok".green(), start.elapsed());

    let metrics = engine.metrics().cloned().unwrap_or_default();
    println!();
    println!("CV RMSE: {:.2}", metrics.cv_rmse);
    println!("R2:      {:.4}", metrics.r2);

    engine.save(model_out.to_str().unwrap_or("model.json"))?;
    preprocessor.save(preprocessor_out.to_str().unwrap_or("preprocessor.json"))?;
    println!();
    println!(
        "Saved model to {} and preprocessor to {}",
        model_out.display(),
        preprocessor_out.display()
    );

    Ok(())
}

fn cmd_predict(
    model_path: &PathBuf,
    preprocessor_path: Option<&std::path::Path>,
    data_path: &PathBuf,
    output: &PathBuf,
    id_column: &str,
) -> anyhow::Result<()> {
    println!("{}", "Homeprice - Prediction".blue().bold());
    println!();

    let loader = DatasetLoader::new();

    print!("Loading data... ");
    let df = loader.load_test(data_path, id_column)?;
    println!("{} ({} rows x {} cols)", "ok".green(), df.height(), df.width());

    let config = InferenceConfig::new().with_id_column(id_column);
    let engine = InferenceEngine::load(
        config,
        preprocessor_path.and_then(|p| p.to_str()),
        model_path.to_str().unwrap_or("model.json"),
    )?;

    print!("Predicting... ");
    let start = Instant::now();
    let submission = engine.predict_submission(&df)?;
    println!("{} ({:?})", "ok".green(), start.elapsed());

    submission.write_csv(output)?;
    println!("Wrote {} rows to {}", submission.len(), output.display());

    Ok(())
}

fn cmd_info(data_path: &PathBuf) -> anyhow::Result<()> {
    println!("{}", "Homeprice - Data Info".blue().bold());
    println!();

    let df = DatasetLoader::new().load_csv(data_path)?;

    println!("File: {}", data_path.display());
    println!("Rows: {}", df.height());
    println!("Columns: {}", df.width());
    println!();

    println!("{:<20} {:<15} {:>10} {:>10}", "Column", "Type", "Nulls", "Unique");
    println!("{}", "-".repeat(60));

    for col in df.get_columns() {
        let null_count = col.null_count();
        let unique_count = col.n_unique().unwrap_or(0);
        println!(
            "{:<20} {:<15} {:>10} {:>10}",
            col.name(),
            format!("{:?}", col.dtype()),
            null_count,
            unique_count
        );
    }

    Ok(())
}
