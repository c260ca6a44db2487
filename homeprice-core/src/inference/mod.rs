//! Inference and submission assembly

mod engine;

pub use engine::{InferenceConfig, InferenceEngine};
