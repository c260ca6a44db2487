//! End-to-end pipeline
//!
//! Wires the stages together for the single-command flow: preprocess the
//! training frame, optionally grid-search hyperparameters, fit, transform
//! the test frame, and assemble the submission.

use crate::data::Submission;
use crate::error::Result;
use crate::inference::{InferenceConfig, InferenceEngine};
use crate::optimizer::{GridSearch, ParamGrid, TrialOutcome};
use crate::preprocessing::{DataPreprocessor, PreprocessingConfig};
use crate::training::{ModelMetrics, TrainEngine, TrainingConfig};
use polars::prelude::*;

/// Full train-to-submission pipeline
pub struct PricePipeline {
    preprocessing: PreprocessingConfig,
    training: TrainingConfig,
    grid: Option<ParamGrid>,
}

/// Artifacts of a completed pipeline run
pub struct PipelineRun {
    pub submission: Submission,
    pub metrics: ModelMetrics,
    /// Gain-share feature importances, descending
    pub importances: Vec<(String, f64)>,
    /// Winning grid trial, when a search ran
    pub best_trial: Option<TrialOutcome>,
    pub preprocessor: DataPreprocessor,
    pub engine: TrainEngine,
}

impl PricePipeline {
    /// Create a pipeline from stage configurations
    pub fn new(preprocessing: PreprocessingConfig, training: TrainingConfig) -> Self {
        Self {
            preprocessing,
            training,
            grid: None,
        }
    }

    /// Enable hyperparameter grid search before the final fit
    pub fn with_grid(mut self, grid: ParamGrid) -> Self {
        self.grid = Some(grid);
        self
    }

    /// Run the full pipeline against raw train and test frames
    pub fn run(&self, train: &DataFrame, test: &DataFrame) -> Result<PipelineRun> {
        tracing::info!(
            train_rows = train.height(),
            test_rows = test.height(),
            "pipeline started"
        );

        let mut preprocessor = DataPreprocessor::with_config(self.preprocessing.clone());
        let processed_train = preprocessor.fit_transform_train(train)?;

        let (training_config, best_trial) = match &self.grid {
            Some(grid) => {
                let outcome =
                    GridSearch::new(self.training.clone(), grid.clone()).search(&processed_train)?;
                (outcome.best_config, Some(outcome.best))
            }
            None => (self.training.clone(), None),
        };

        let mut engine = TrainEngine::new(training_config);
        engine.fit(&processed_train)?;

        let metrics = engine
            .metrics()
            .cloned()
            .unwrap_or_default();
        let importances = engine.feature_importance()?;

        let inference_config = InferenceConfig::new()
            .with_id_column(self.preprocessing.id_column.clone())
            .with_price_column(self.preprocessing.target_column.clone());

        // The inference engine borrows the fitted state; ids come from the
        // raw test frame so order survives preprocessing untouched.
        let inference = InferenceEngine::new(inference_config)
            .with_preprocessor(preprocessor.clone())
            .with_model(engine.clone());
        let submission = inference.predict_submission(test)?;

        tracing::info!(
            cv_rmse = metrics.cv_rmse,
            predictions = submission.len(),
            "pipeline finished"
        );

        Ok(PipelineRun {
            submission,
            metrics,
            importances,
            best_trial,
            preprocessor,
            engine,
        })
    }
}
