//! Hyperparameter optimization
//!
//! Exhaustive grid search over the boosting parameters, scored by mean
//! cross-validated RMSE.

mod grid;

pub use grid::{GridPoint, GridSearch, ParamGrid, SearchOutcome, TrialOutcome};
