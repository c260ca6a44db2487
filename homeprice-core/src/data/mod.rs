//! Data loading and submission writing
//!
//! CSV ingestion for the train/test frames and the two-column
//! submission file produced at the end of the pipeline.

mod loader;
mod submission;

pub use loader::{require_columns, DatasetLoader};
pub use submission::Submission;
