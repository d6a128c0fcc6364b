//! Regression metrics for days-until-bloom predictions.
//!
//! Includes R², MSE, RMSE and MAE, plus [`RegressionReport`] which bundles
//! them for model comparison and reporting.

use crate::primitives::Vector;
use serde::{Deserialize, Serialize};

/// Computes the coefficient of determination (R²).
///
/// R² = 1 - (`SS_res` / `SS_tot`)
///
/// Returns 0.0 when `y_true` is constant.
///
/// # Examples
///
/// ```
/// use bloomcast::metrics::r_squared;
/// use bloomcast::primitives::Vector;
///
/// let y_true = Vector::from_slice(&[3.0, -0.5, 2.0, 7.0]);
/// let y_pred = Vector::from_slice(&[2.5, 0.0, 2.0, 8.0]);
/// let r2 = r_squared(&y_pred, &y_true);
/// assert!(r2 > 0.9);
/// ```
///
/// # Panics
///
/// Panics if vectors have different lengths.
#[must_use]
pub fn r_squared(y_pred: &Vector, y_true: &Vector) -> f64 {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");

    let y_mean = y_true.mean();

    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    let ss_tot: f64 = y_true.iter().map(|t| (t - y_mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return 0.0;
    }

    1.0 - (ss_res / ss_tot)
}

/// Computes the Mean Squared Error (MSE).
///
/// # Panics
///
/// Panics if vectors have different lengths or are empty.
#[must_use]
pub fn mse(y_pred: &Vector, y_true: &Vector) -> f64 {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    assert!(!y_true.is_empty(), "Vectors cannot be empty");

    let sum_sq_error: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    sum_sq_error / y_true.len() as f64
}

/// Computes the Mean Absolute Error (MAE).
///
/// MAE = (1/n) * `Σ|y_true - y_pred|`
///
/// # Examples
///
/// ```
/// use bloomcast::metrics::mae;
/// use bloomcast::primitives::Vector;
///
/// let y_true = Vector::from_slice(&[30.0, 10.0]);
/// let y_pred = Vector::from_slice(&[26.0, 12.0]);
/// assert!((mae(&y_pred, &y_true) - 3.0).abs() < 1e-12);
/// ```
///
/// # Panics
///
/// Panics if vectors have different lengths or are empty.
#[must_use]
pub fn mae(y_pred: &Vector, y_true: &Vector) -> f64 {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    assert!(!y_true.is_empty(), "Vectors cannot be empty");

    let sum_abs_error: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).abs())
        .sum();

    sum_abs_error / y_true.len() as f64
}

/// Computes the Root Mean Squared Error (RMSE).
///
/// # Panics
///
/// Panics if vectors have different lengths or are empty.
#[must_use]
pub fn rmse(y_pred: &Vector, y_true: &Vector) -> f64 {
    mse(y_pred, y_true).sqrt()
}

/// MAE, RMSE and R² of one prediction set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    /// Mean absolute error in days.
    pub mae: f64,
    /// Root mean squared error in days.
    pub rmse: f64,
    /// Coefficient of determination.
    pub r2: f64,
}

impl RegressionReport {
    /// Computes all three metrics.
    ///
    /// # Panics
    ///
    /// Panics if vectors have different lengths or are empty.
    #[must_use]
    pub fn compute(y_pred: &Vector, y_true: &Vector) -> Self {
        Self {
            mae: mae(y_pred, y_true),
            rmse: rmse(y_pred, y_true),
            r2: r_squared(y_pred, y_true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (Vector, Vector) {
        (
            Vector::from_slice(&[2.5, 0.0, 2.0, 8.0]),
            Vector::from_slice(&[3.0, -0.5, 2.0, 7.0]),
        )
    }

    #[test]
    fn test_r_squared_perfect() {
        let y = Vector::from_slice(&[1.0, 2.0, 3.0]);
        assert!((r_squared(&y, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_r_squared_constant_target() {
        let y_true = Vector::from_slice(&[5.0, 5.0, 5.0]);
        let y_pred = Vector::from_slice(&[4.0, 5.0, 6.0]);
        assert_eq!(r_squared(&y_pred, &y_true), 0.0);
    }

    #[test]
    fn test_mse_and_rmse() {
        let (y_pred, y_true) = pair();
        // (0.25 + 0.25 + 0 + 1) / 4
        assert!((mse(&y_pred, &y_true) - 0.375).abs() < 1e-12);
        assert!((rmse(&y_pred, &y_true) - 0.375_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_mae() {
        let (y_pred, y_true) = pair();
        assert!((mae(&y_pred, &y_true) - 0.5).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "Vectors must have same length")]
    fn test_mae_length_mismatch() {
        let _ = mae(&Vector::zeros(2), &Vector::zeros(3));
    }

    #[test]
    #[should_panic(expected = "Vectors cannot be empty")]
    fn test_mse_empty() {
        let _ = mse(&Vector::zeros(0), &Vector::zeros(0));
    }

    #[test]
    fn test_report() {
        let (y_pred, y_true) = pair();
        let report = RegressionReport::compute(&y_pred, &y_true);
        assert!((report.mae - 0.5).abs() < 1e-12);
        assert!(report.r2 > 0.9);
    }
}
