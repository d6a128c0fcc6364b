use crate::error::{BloomError, Result};
use crate::metrics::{mae, mse, r_squared};
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cross-validation scoring rule. Higher is always better, so error
/// metrics are negated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    /// Negated mean absolute error.
    #[default]
    NegMeanAbsoluteError,
    /// Negated mean squared error.
    NegMeanSquaredError,
    /// Coefficient of determination.
    R2,
}

impl Scoring {
    /// Scores one prediction set.
    ///
    /// # Panics
    ///
    /// Panics if vectors have different lengths or are empty.
    #[must_use]
    pub fn score(self, y_pred: &Vector, y_true: &Vector) -> f64 {
        match self {
            Self::NegMeanAbsoluteError => -mae(y_pred, y_true),
            Self::NegMeanSquaredError => -mse(y_pred, y_true),
            Self::R2 => r_squared(y_pred, y_true),
        }
    }

    /// Config/CLI name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NegMeanAbsoluteError => "neg_mean_absolute_error",
            Self::NegMeanSquaredError => "neg_mean_squared_error",
            Self::R2 => "r2",
        }
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scoring {
    type Err = BloomError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "neg_mean_absolute_error" => Ok(Self::NegMeanAbsoluteError),
            "neg_mean_squared_error" => Ok(Self::NegMeanSquaredError),
            "r2" => Ok(Self::R2),
            other => Err(BloomError::configuration(format!(
                "unknown scoring '{other}'"
            ))),
        }
    }
}

/// K-Fold cross-validator.
///
/// Splits rows into K consecutive folds; each fold is the validation set
/// once while the rest train. Folds are contiguous unless a random state is
/// set, and the first `n % k` folds get one extra row.
///
/// # Example
///
/// ```
/// use bloomcast::model_selection::KFold;
///
/// let folds = KFold::new(3).split(7).expect("2 <= k <= n");
/// assert_eq!(folds[0].1, vec![0, 1, 2]);
/// assert_eq!(folds[2].1, vec![5, 6]);
/// ```
#[derive(Debug, Clone)]
pub struct KFold {
    n_splits: usize,
    random_state: Option<u64>,
}

impl KFold {
    /// Creates an unshuffled K-Fold cross-validator.
    #[must_use]
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            random_state: None,
        }
    }

    /// Shuffles rows with a seeded RNG before folding.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Number of folds.
    #[must_use]
    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generates `(train_indices, validation_indices)` for each fold.
    ///
    /// # Errors
    ///
    /// Returns a configuration error unless `2 <= n_splits <= n_samples`.
    pub fn split(&self, n_samples: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        if self.n_splits < 2 || self.n_splits > n_samples {
            return Err(BloomError::configuration(format!(
                "cv folds must satisfy 2 <= k <= n_samples, got k={} with {n_samples} samples",
                self.n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if let Some(seed) = self.random_state {
            let mut rng = StdRng::seed_from_u64(seed);
            indices.shuffle(&mut rng);
        }

        let fold_size = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut result = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for i in 0..self.n_splits {
            let size = if i < remainder { fold_size + 1 } else { fold_size };
            let end = start + size;

            let test = indices[start..end].to_vec();
            let mut train = Vec::with_capacity(n_samples - size);
            train.extend_from_slice(&indices[..start]);
            train.extend_from_slice(&indices[end..]);

            result.push((train, test));
            start = end;
        }
        Ok(result)
    }
}

/// Per-fold validation scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationResult {
    /// Score for each fold
    pub scores: Vec<f64>,
}

impl CrossValidationResult {
    /// Mean score across folds
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().sum::<f64>() / self.scores.len() as f64
    }

    /// Population standard deviation of the fold scores
    #[must_use]
    pub fn std(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .scores
            .iter()
            .map(|&score| (score - mean).powi(2))
            .sum::<f64>()
            / self.scores.len() as f64;
        variance.sqrt()
    }
}

/// Fits a fresh clone of `estimator` on each training fold and scores it on
/// the matching validation fold.
///
/// # Errors
///
/// Returns an error if the folds are invalid for the row count or any fold
/// fails to fit.
///
/// # Example
///
/// ```
/// use bloomcast::prelude::*;
/// use bloomcast::model_selection::{cross_validate, KFold, Scoring};
///
/// let x = Matrix::from_vec(20, 1, (0..20).map(f64::from).collect()).expect("20x1");
/// let y: Vector = (0..20).map(|i| 3.0 * f64::from(i) - 2.0).collect();
///
/// let result = cross_validate(&LinearRegression::new(), &x, &y, &KFold::new(4), Scoring::R2)
///     .expect("enough rows per fold");
/// assert_eq!(result.scores.len(), 4);
/// ```
pub fn cross_validate<E>(
    estimator: &E,
    x: &Matrix,
    y: &Vector,
    cv: &KFold,
    scoring: Scoring,
) -> Result<CrossValidationResult>
where
    E: Estimator + Clone,
{
    if x.n_rows() != y.len() {
        return Err(BloomError::dimension_mismatch("n_samples", x.n_rows(), y.len()));
    }

    let splits = cv.split(x.n_rows())?;
    let mut scores = Vec::with_capacity(splits.len());
    for (train_idx, test_idx) in splits {
        let mut fold_model = estimator.clone();
        fold_model.fit(&x.select_rows(&train_idx), &y.select(&train_idx))?;

        let y_pred = fold_model.predict(&x.select_rows(&test_idx))?;
        scores.push(scoring.score(&y_pred, &y.select(&test_idx)));
    }

    Ok(CrossValidationResult { scores })
}
