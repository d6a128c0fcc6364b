//! Core traits for estimators and transformers.
//!
//! These are the capability interfaces the pipeline depends on:
//! `fit(X, y)` / `predict(X)` for regressors and `fit(X)` / `transform(X)`
//! for feature scalers. Any implementation satisfying them is
//! interchangeable.

use crate::error::Result;
use crate::primitives::{Matrix, Vector};

/// Supervised regression estimator.
///
/// # Examples
///
/// ```
/// use bloomcast::prelude::*;
///
/// // y = 2x + 1
/// let x = Matrix::from_vec(4, 1, vec![1.0, 2.0, 3.0, 4.0]).expect("4x1");
/// let y = Vector::from_slice(&[3.0, 5.0, 7.0, 9.0]);
///
/// let mut model = LinearRegression::new();
/// model.fit(&x, &y).expect("well-conditioned data");
/// assert!(model.score(&x, &y).expect("fitted") > 0.99);
/// ```
pub trait Estimator {
    /// Fits the model to training data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails (dimension mismatch, singular matrix, etc.).
    fn fit(&mut self, x: &Matrix, y: &Vector) -> Result<()>;

    /// Predicts target values for input data.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted or the feature count differs.
    fn predict(&self, x: &Matrix) -> Result<Vector>;

    /// Computes the R² score of the predictions against `y`.
    ///
    /// # Errors
    ///
    /// Returns an error if prediction fails.
    fn score(&self, x: &Matrix, y: &Vector) -> Result<f64> {
        let y_pred = self.predict(x)?;
        Ok(crate::metrics::r_squared(&y_pred, y))
    }
}

/// Feature transformer (scalers).
pub trait Transformer {
    /// Fits the transformer to data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit(&mut self, x: &Matrix) -> Result<()>;

    /// Transforms data using fitted parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if transformer is not fitted.
    fn transform(&self, x: &Matrix) -> Result<Matrix>;

    /// Fits and transforms in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit_transform(&mut self, x: &Matrix) -> Result<Matrix> {
        self.fit(x)?;
        self.transform(x)
    }
}
