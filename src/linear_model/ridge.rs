use super::{check_fit_input, linear_predict, solve_normal_equations};
use crate::error::{BloomError, Result};
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use serde::{Deserialize, Serialize};

/// Ridge regression with L2 regularization.
///
/// Minimizes `||y - Xβ||² + α||β||²`. The intercept is not penalized.
///
/// # Examples
///
/// ```
/// use bloomcast::prelude::*;
/// use bloomcast::linear_model::Ridge;
///
/// let x = Matrix::from_vec(5, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0]).expect("5x1");
/// let y = Vector::from_slice(&[3.0, 5.0, 7.0, 9.0, 11.0]);
///
/// let mut model = Ridge::new(0.1);
/// model.fit(&x, &y).expect("positive definite system");
/// assert!(model.score(&x, &y).expect("fitted") > 0.99);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ridge {
    /// Regularization strength.
    alpha: f64,
    /// Coefficients for features (excluding intercept).
    coefficients: Option<Vector>,
    /// Intercept (bias) term.
    intercept: f64,
    /// Whether to fit an intercept.
    fit_intercept: bool,
}

impl Ridge {
    /// Creates a new `Ridge` regression with the given regularization strength.
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
        }
    }

    /// Sets whether to fit an intercept term.
    #[must_use]
    pub fn with_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
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
}

impl Estimator for Ridge {
    /// Solves `β = (X^T X + αI)^-1 X^T y`.
    ///
    /// # Errors
    ///
    /// Returns an error if alpha is negative, dimensions don't match, or the
    /// regularized system is singular.
    fn fit(&mut self, x: &Matrix, y: &Vector) -> Result<()> {
        if !(self.alpha >= 0.0 && self.alpha.is_finite()) {
            return Err(BloomError::configuration(format!(
                "Ridge alpha must be a finite non-negative number, got {}",
                self.alpha
            )));
        }
        check_fit_input(x, y)?;

        let (intercept, coefficients) =
            solve_normal_equations(x, y, self.alpha, self.fit_intercept)?;
        self.intercept = intercept;
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vector> {
        linear_predict(self.coefficients.as_ref(), self.intercept, x, "Ridge")
    }
}
