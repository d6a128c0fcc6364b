//! L1-penalized linear models fit by coordinate descent.
//!
//! Both models minimize
//!
//! ```text
//! 1/(2n) ||y - Xβ||² + α·ρ·||β||₁ + α·(1-ρ)/2·||β||²
//! ```
//!
//! with `ρ = 1` for [`Lasso`]. Features and target are centered when an
//! intercept is fit, so the intercept is never penalized.

use super::{check_fit_input, linear_predict};
use crate::error::{BloomError, Result};
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use serde::{Deserialize, Serialize};

const DEFAULT_MAX_ITER: usize = 1000;
const DEFAULT_TOL: f64 = 1e-4;

/// Lasso regression with L1 regularization.
///
/// Produces sparse coefficient vectors; features whose correlation with the
/// residual never exceeds the penalty stay at exactly zero.
///
/// # Examples
///
/// ```
/// use bloomcast::prelude::*;
/// use bloomcast::linear_model::Lasso;
///
/// let x = Matrix::from_vec(5, 2, vec![
///     1.0, 2.0,
///     2.0, 3.0,
///     3.0, 4.0,
///     4.0, 5.0,
///     5.0, 6.0,
/// ]).expect("Valid matrix dimensions");
/// let y = Vector::from_slice(&[5.0, 8.0, 11.0, 14.0, 17.0]);
///
/// let mut model = Lasso::new(0.1);
/// model.fit(&x, &y).expect("valid data");
/// assert!(model.score(&x, &y).expect("fitted") > 0.9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lasso {
    alpha: f64,
    coefficients: Option<Vector>,
    intercept: f64,
    fit_intercept: bool,
    max_iter: usize,
    tol: f64,
}

impl Lasso {
    /// Creates a new `Lasso` with the given regularization strength.
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOL,
        }
    }

    /// Sets whether to fit an intercept term.
    #[must_use]
    pub fn with_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Sets the maximum number of coordinate descent sweeps.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the convergence tolerance on the largest coefficient change.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Returns the regularization strength (alpha).
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Coefficients (excluding intercept), `None` before fit.
    #[must_use]
    pub fn coefficients(&self) -> Option<&Vector> {
        self.coefficients.as_ref()
    }

    /// Returns the intercept term.
    #[must_use]
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Returns true if the model has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    /// Soft-thresholding operator: `sign(x) * max(|x| - λ, 0)`.
    #[must_use]
    pub fn soft_threshold(x: f64, lambda: f64) -> f64 {
        if x > lambda {
            x - lambda
        } else if x < -lambda {
            x + lambda
        } else {
            0.0
        }
    }
}

impl Estimator for Lasso {
    /// Fits the model using coordinate descent.
    ///
    /// # Errors
    ///
    /// Returns an error if alpha is invalid or input dimensions don't match.
    fn fit(&mut self, x: &Matrix, y: &Vector) -> Result<()> {
        let settings = Penalty {
            alpha: self.alpha,
            l1_ratio: 1.0,
            fit_intercept: self.fit_intercept,
            max_iter: self.max_iter,
            tol: self.tol,
        };
        let (intercept, coefficients) = coordinate_descent(x, y, &settings)?;
        self.intercept = intercept;
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vector> {
        linear_predict(self.coefficients.as_ref(), self.intercept, x, "Lasso")
    }
}

/// Elastic Net regression: a mix of L1 and L2 penalties.
///
/// `l1_ratio = 1.0` is equivalent to [`Lasso`], `l1_ratio = 0.0` to a
/// ridge penalty on the same scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticNet {
    alpha: f64,
    l1_ratio: f64,
    coefficients: Option<Vector>,
    intercept: f64,
    fit_intercept: bool,
    max_iter: usize,
    tol: f64,
}

impl ElasticNet {
    /// Creates a new `ElasticNet` with the given penalty strength and L1 share.
    #[must_use]
    pub fn new(alpha: f64, l1_ratio: f64) -> Self {
        Self {
            alpha,
            l1_ratio,
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOL,
        }
    }

    /// Sets whether to fit an intercept term.
    #[must_use]
    pub fn with_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Sets the maximum number of coordinate descent sweeps.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the convergence tolerance.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Returns the regularization strength (alpha).
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Returns the L1 share of the penalty.
    #[must_use]
    pub fn l1_ratio(&self) -> f64 {
        self.l1_ratio
    }

    /// Coefficients (excluding intercept), `None` before fit.
    #[must_use]
    pub fn coefficients(&self) -> Option<&Vector> {
        self.coefficients.as_ref()
    }

    /// Returns the intercept term.
    #[must_use]
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Returns true if the model has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }
}

impl Estimator for ElasticNet {
    /// Fits the model using coordinate descent.
    ///
    /// # Errors
    ///
    /// Returns an error if alpha or l1_ratio is invalid or input dimensions
    /// don't match.
    fn fit(&mut self, x: &Matrix, y: &Vector) -> Result<()> {
        let settings = Penalty {
            alpha: self.alpha,
            l1_ratio: self.l1_ratio,
            fit_intercept: self.fit_intercept,
            max_iter: self.max_iter,
            tol: self.tol,
        };
        let (intercept, coefficients) = coordinate_descent(x, y, &settings)?;
        self.intercept = intercept;
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vector> {
        linear_predict(self.coefficients.as_ref(), self.intercept, x, "ElasticNet")
    }
}

struct Penalty {
    alpha: f64,
    l1_ratio: f64,
    fit_intercept: bool,
    max_iter: usize,
    tol: f64,
}

/// Returns `(intercept, coefficients)`.
fn coordinate_descent(x: &Matrix, y: &Vector, penalty: &Penalty) -> Result<(f64, Vector)> {
    if !(penalty.alpha >= 0.0 && penalty.alpha.is_finite()) {
        return Err(BloomError::configuration(format!(
            "alpha must be a finite non-negative number, got {}",
            penalty.alpha
        )));
    }
    if !(0.0..=1.0).contains(&penalty.l1_ratio) {
        return Err(BloomError::configuration(format!(
            "l1_ratio must lie in [0, 1], got {}",
            penalty.l1_ratio
        )));
    }
    check_fit_input(x, y)?;

    let (n_samples, n_features) = x.shape();
    let n = n_samples as f64;

    let (x_mean, y_mean): (Vec<f64>, f64) = if penalty.fit_intercept {
        ((0..n_features).map(|j| x.column(j).mean()).collect(), y.mean())
    } else {
        (vec![0.0; n_features], 0.0)
    };

    // Column-major centered copy for cheap per-feature sweeps
    let columns: Vec<Vec<f64>> = (0..n_features)
        .map(|j| x.column(j).iter().map(|v| v - x_mean[j]).collect())
        .collect();
    let col_norms_sq: Vec<f64> = columns
        .iter()
        .map(|col| col.iter().map(|v| v * v).sum())
        .collect();

    let mut residual: Vec<f64> = y.iter().map(|v| v - y_mean).collect();
    let mut beta = vec![0.0; n_features];

    let l1_penalty = n * penalty.alpha * penalty.l1_ratio;
    let l2_penalty = n * penalty.alpha * (1.0 - penalty.l1_ratio);

    for _ in 0..penalty.max_iter {
        let mut max_change = 0.0_f64;

        for j in 0..n_features {
            if col_norms_sq[j] < 1e-10 {
                continue;
            }
            let col = &columns[j];
            let old = beta[j];

            let rho = col
                .iter()
                .zip(&residual)
                .map(|(xij, r)| xij * r)
                .sum::<f64>()
                + col_norms_sq[j] * old;

            let new = Lasso::soft_threshold(rho, l1_penalty) / (col_norms_sq[j] + l2_penalty);
            let delta = new - old;
            if delta != 0.0 {
                for (r, xij) in residual.iter_mut().zip(col) {
                    *r -= xij * delta;
                }
                beta[j] = new;
            }
            max_change = max_change.max(delta.abs());
        }

        if max_change < penalty.tol {
            break;
        }
    }

    let intercept = if penalty.fit_intercept {
        y_mean - beta.iter().zip(&x_mean).map(|(b, m)| b * m).sum::<f64>()
    } else {
        0.0
    };

    Ok((intercept, Vector::from_vec(beta)))
}
