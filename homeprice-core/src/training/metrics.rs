//! Regression metrics

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Root mean squared error: sqrt(mean((pred - actual)^2))
pub fn rmse(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> f64 {
    debug_assert_eq!(y_true.len(), y_pred.len());
    if y_true.is_empty() {
        return 0.0;
    }

    let sum_sq: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| {
            let diff = p - t;
            diff * diff
        })
        .sum();
    (sum_sq / y_true.len() as f64).sqrt()
}

/// Mean absolute error
pub fn mae(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> f64 {
    debug_assert_eq!(y_true.len(), y_pred.len());
    if y_true.is_empty() {
        return 0.0;
    }

    let sum_abs: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (p - t).abs())
        .sum();
    sum_abs / y_true.len() as f64
}

/// Coefficient of determination
pub fn r2(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> f64 {
    debug_assert_eq!(y_true.len(), y_pred.len());
    if y_true.is_empty() {
        return 0.0;
    }

    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| {
            let diff = t - p;
            diff * diff
        })
        .sum();
    let ss_tot: f64 = y_true
        .iter()
        .map(|t| {
            let diff = t - mean;
            diff * diff
        })
        .sum();

    if ss_tot == 0.0 {
        return 0.0;
    }
    1.0 - ss_res / ss_tot
}

/// Fitted-model evaluation summary
///
/// `rmse`, `mae`, and `r2` are computed from out-of-fold predictions on the
/// de-logged price scale; `rmse_log` is the same error in the log space the
/// ensemble was fit in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub rmse: f64,
    pub rmse_log: f64,
    pub mae: f64,
    pub r2: f64,
    /// Per-fold validation RMSE on the price scale
    pub cv_scores: Vec<f64>,
    /// Mean of `cv_scores`
    pub cv_rmse: f64,
    pub training_time_secs: f64,
    pub n_samples: usize,
    pub n_features: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_rmse_perfect_prediction() {
        let y = array![1.0, 2.0, 3.0];
        assert_eq!(rmse(y.view(), y.view()), 0.0);
    }

    #[test]
    fn test_rmse_known_value() {
        let y_true = array![0.0, 0.0];
        let y_pred = array![3.0, 4.0];
        assert_relative_eq!(
            rmse(y_true.view(), y_pred.view()),
            (12.5f64).sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_mae_known_value() {
        let y_true = array![1.0, 2.0];
        let y_pred = array![2.0, 4.0];
        assert_relative_eq!(mae(y_true.view(), y_pred.view()), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_r2_perfect_and_mean() {
        let y = array![1.0, 2.0, 3.0];
        assert_relative_eq!(r2(y.view(), y.view()), 1.0, epsilon = 1e-12);

        let mean_pred = array![2.0, 2.0, 2.0];
        assert_relative_eq!(r2(y.view(), mean_pred.view()), 0.0, epsilon = 1e-12);
    }
}
