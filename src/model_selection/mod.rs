//! Model selection utilities: temporal splitting, K-fold cross-validation
//! and hyperparameter grid search.
//!
//! Observations are time-ordered, so the train/test partition never
//! shuffles: the leading rows train, the trailing rows test, and the scaler
//! only ever sees the training rows.

mod cross_validation;
mod grid_search;

pub use cross_validation::{cross_validate, CrossValidationResult, KFold, Scoring};
pub use grid_search::{grid_search, GridPoint, GridSearchResult, ParamGrid};

use crate::error::{BloomError, Result};
use crate::preprocessing::{FittedScaler, ScalerKind};
use crate::primitives::{Matrix, Vector};
use tracing::debug;

/// Index of the first test row: `floor(n * (1 - test_fraction))`.
///
/// # Errors
///
/// Returns a configuration error if `test_fraction` is outside `(0, 1)`.
///
/// # Example
///
/// ```
/// use bloomcast::model_selection::split_index;
///
/// assert_eq!(split_index(10, 0.2).expect("valid fraction"), 8);
/// assert_eq!(split_index(7, 0.25).expect("valid fraction"), 5);
/// ```
pub fn split_index(n_rows: usize, test_fraction: f64) -> Result<usize> {
    validate_test_fraction(test_fraction)?;
    let train = (n_rows as f64 * (1.0 - test_fraction)).floor();
    // Guard against float error pushing the cut past the end
    Ok((train as usize).min(n_rows))
}

/// Checks that a test fraction lies strictly between 0 and 1.
///
/// # Errors
///
/// Returns a configuration error otherwise (NaN included).
pub fn validate_test_fraction(test_fraction: f64) -> Result<()> {
    if test_fraction > 0.0 && test_fraction < 1.0 {
        Ok(())
    } else {
        Err(BloomError::configuration(format!(
            "test_fraction must lie in (0, 1), got {test_fraction}"
        )))
    }
}

/// Output of [`split_and_scale`].
#[derive(Debug, Clone)]
pub struct TemporalSplit {
    /// Scaled leading rows.
    pub train_features: Matrix,
    /// Scaled trailing rows, transformed with the train-fit scaler.
    pub test_features: Matrix,
    /// Labels of the leading rows.
    pub train_labels: Vector,
    /// Labels of the trailing rows.
    pub test_labels: Vector,
    /// Scaler fit on `train_features` before scaling.
    pub scaler: FittedScaler,
    /// Row index where the test slice starts.
    pub split_index: usize,
}

impl TemporalSplit {
    /// Number of training rows.
    #[must_use]
    pub fn n_train(&self) -> usize {
        self.train_labels.len()
    }

    /// Number of test rows.
    #[must_use]
    pub fn n_test(&self) -> usize {
        self.test_labels.len()
    }
}

/// Splits rows into a leading train slice and trailing test slice, then
/// fits a scaler on the train slice and applies it to both.
///
/// # Errors
///
/// Returns a configuration error for an invalid `test_fraction`, a
/// dimension error if features and labels differ in length, and an
/// insufficient-data error if either slice would be empty.
///
/// # Example
///
/// ```
/// use bloomcast::model_selection::split_and_scale;
/// use bloomcast::preprocessing::ScalerKind;
/// use bloomcast::primitives::{Matrix, Vector};
///
/// let x = Matrix::from_vec(5, 1, vec![0.0, 1.0, 2.0, 4.0, 100.0]).expect("5x1");
/// let y = Vector::from_slice(&[40.0, 30.0, 20.0, 10.0, 5.0]);
///
/// let split = split_and_scale(&x, &y, 0.2, ScalerKind::MinMax).expect("enough rows");
/// assert_eq!(split.n_train(), 4);
/// assert_eq!(split.test_labels.as_slice(), &[5.0]);
/// // 100 lies outside the training range [0, 4]
/// assert!((split.test_features.get(0, 0) - 25.0).abs() < 1e-12);
/// ```
pub fn split_and_scale(
    features: &Matrix,
    labels: &Vector,
    test_fraction: f64,
    scaler: ScalerKind,
) -> Result<TemporalSplit> {
    let n_rows = features.n_rows();
    if labels.len() != n_rows {
        return Err(BloomError::dimension_mismatch("labels", n_rows, labels.len()));
    }

    let split_index = split_index(n_rows, test_fraction)?;
    if split_index == 0 {
        return Err(BloomError::insufficient_data("temporal split (train slice)", 2, n_rows));
    }
    if split_index == n_rows {
        return Err(BloomError::insufficient_data("temporal split (test slice)", n_rows + 1, n_rows));
    }

    let train_raw = features.slice_rows(0..split_index);
    let test_raw = features.slice_rows(split_index..n_rows);

    let scaler = scaler.fit(&train_raw)?;
    let train_features = scaler.transform(&train_raw)?;
    let test_features = scaler.transform(&test_raw)?;

    debug!(
        rows = n_rows,
        train = split_index,
        test = n_rows - split_index,
        scaler = %scaler.kind(),
        "temporal split"
    );

    Ok(TemporalSplit {
        train_features,
        test_features,
        train_labels: labels.slice(0..split_index),
        test_labels: labels.slice(split_index..n_rows),
        scaler,
        split_index,
    })
}
