//! Gradient-boosted ensemble model
//!
//! Immutable after training: a base score plus a sequence of regression
//! trees whose leaf values already include the learning-rate shrinkage.
//! Predictions are in the (log) target space the ensemble was fit in; the
//! training engine owns the de-transformation.

use super::tree::RegressionTree;
use ndarray::{Array1, ArrayView2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Fitted gradient-boosted tree ensemble
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbdtModel {
    base_score: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl GbdtModel {
    /// Assemble a model from trained trees
    pub fn new(base_score: f64, trees: Vec<RegressionTree>, n_features: usize) -> Self {
        Self {
            base_score,
            trees,
            n_features,
        }
    }

    /// Number of trees in the ensemble
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of features the model was trained on
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// The constant prediction before any tree contributes
    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    /// Predict a single sample
    pub fn predict_row(&self, features: &[f64]) -> f64 {
        self.base_score
            + self
                .trees
                .iter()
                .map(|tree| tree.predict_row(features))
                .sum::<f64>()
    }

    /// Predict every row of a feature matrix
    pub fn predict(&self, x: &ArrayView2<'_, f64>) -> Array1<f64> {
        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|row_idx| {
                let row = x.row(row_idx);
                match row.as_slice() {
                    Some(slice) => self.predict_row(slice),
                    None => {
                        let owned: Vec<f64> = row.to_vec();
                        self.predict_row(&owned)
                    }
                }
            })
            .collect();

        Array1::from_vec(predictions)
    }

    /// Per-feature split gain, normalized to sum to one
    ///
    /// Index order matches the training feature matrix columns.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut gains = vec![0.0; self.n_features];
        for tree in &self.trees {
            tree.accumulate_feature_gains(&mut gains);
        }

        let total: f64 = gains.iter().sum();
        if total > 0.0 {
            for g in gains.iter_mut() {
                *g /= total;
            }
        }
        gains
    }
}
