//! Outlier-robust regressors: Huber M-estimation and RANSAC.

use super::{
    check_fit_input, linear_predict, median, solve_weighted_normal_equations, LinearRegression,
};
use crate::error::{BloomError, Result};
use crate::metrics::r_squared;
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Converts a median absolute deviation into a normal-consistent scale.
const MAD_TO_SIGMA: f64 = 0.674_489_750_196_081_7;

/// Smallest residual scale used when reweighting.
const MIN_SCALE: f64 = 1e-12;

/// Linear regression with the Huber loss.
///
/// Residuals within `epsilon` robust standard deviations are fit by least
/// squares; larger ones contribute linearly, so a few gross outliers cannot
/// drag the fit. Solved by iteratively reweighted least squares: each pass
/// re-estimates the residual scale from the median absolute residual and
/// gives row `i` the weight `min(1, epsilon / |r_i / scale|)`. A small L2
/// penalty `alpha` keeps the weighted system well-posed.
///
/// # Examples
///
/// ```
/// use bloomcast::prelude::*;
/// use bloomcast::linear_model::HuberRegressor;
///
/// let x = Matrix::from_vec(6, 1, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).expect("6x1");
/// // y = 2x + 1 with one corrupted target
/// let y = Vector::from_slice(&[1.0, 3.0, 5.0, 7.0, 9.0, 60.0]);
///
/// let mut model = HuberRegressor::new();
/// model.fit(&x, &y).expect("fits");
/// let slope = model.coefficients().expect("fitted")[0];
/// assert!((slope - 2.0).abs() < 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HuberRegressor {
    epsilon: f64,
    alpha: f64,
    max_iter: usize,
    tol: f64,
    coefficients: Option<Vector>,
    intercept: f64,
    scale: f64,
    n_iter: usize,
}

impl Default for HuberRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl HuberRegressor {
    /// Creates an unfitted model with `epsilon = 1.35` and `alpha = 1e-4`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epsilon: 1.35,
            alpha: 1e-4,
            max_iter: 100,
            tol: 1e-5,
            coefficients: None,
            intercept: 0.0,
            scale: 0.0,
            n_iter: 0,
        }
    }

    /// Sets the threshold, in robust standard deviations, where the loss turns linear.
    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets the L2 penalty on the coefficients.
    #[must_use]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the maximum number of reweighting passes.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
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

    /// Robust residual scale from the last pass.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Reweighting passes run by the last fit.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Returns true if the model has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }
}

impl Estimator for HuberRegressor {
    /// # Errors
    ///
    /// Returns a configuration error if `epsilon < 1` or `alpha` is negative,
    /// or propagates dimension and solver failures.
    fn fit(&mut self, x: &Matrix, y: &Vector) -> Result<()> {
        if !(self.epsilon >= 1.0 && self.epsilon.is_finite()) {
            return Err(BloomError::configuration(format!(
                "Huber epsilon must be finite and at least 1, got {}",
                self.epsilon
            )));
        }
        if !(self.alpha >= 0.0 && self.alpha.is_finite()) {
            return Err(BloomError::configuration(format!(
                "Huber alpha must be a finite non-negative number, got {}",
                self.alpha
            )));
        }
        check_fit_input(x, y)?;

        let (mut intercept, mut coef) =
            solve_weighted_normal_equations(x, y, None, self.alpha, true)?;
        let mut weights = vec![1.0; y.len()];
        self.n_iter = 0;

        for _ in 0..self.max_iter {
            let predictions = x.matvec(&coef)?.add_scalar(intercept);
            let abs_residuals: Vec<f64> = y
                .iter()
                .zip(&predictions)
                .map(|(t, p)| (t - p).abs())
                .collect();
            self.scale = (median(&mut abs_residuals.clone()) / MAD_TO_SIGMA).max(MIN_SCALE);

            for (w, r) in weights.iter_mut().zip(&abs_residuals) {
                let z = r / self.scale;
                *w = if z <= self.epsilon { 1.0 } else { self.epsilon / z };
            }

            let (next_intercept, next_coef) =
                solve_weighted_normal_equations(x, y, Some(&weights), self.alpha, true)?;
            let change = next_coef
                .iter()
                .zip(&coef)
                .map(|(a, b)| (a - b).abs())
                .fold((next_intercept - intercept).abs(), f64::max);

            intercept = next_intercept;
            coef = next_coef;
            self.n_iter += 1;
            if change < self.tol {
                break;
            }
        }

        debug!(n_iter = self.n_iter, scale = self.scale, "huber fit");
        self.intercept = intercept;
        self.coefficients = Some(coef);
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vector> {
        linear_predict(self.coefficients.as_ref(), self.intercept, x, "HuberRegressor")
    }
}

/// RANSAC (random sample consensus) around ordinary least squares.
///
/// Each trial fits OLS to a random minimal subset and counts the rows whose
/// absolute residual is within `residual_threshold`. The largest consensus
/// set wins (ties go to the higher R² on that set), and the final model is
/// refit on it. Subsets that can't be solved are skipped.
///
/// Defaults: `n_features + 1` rows per subset, the median absolute
/// deviation of `y` as threshold, 100 trials, seed 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RansacRegressor {
    max_trials: usize,
    min_samples: Option<usize>,
    residual_threshold: Option<f64>,
    random_state: u64,
    estimator: Option<LinearRegression>,
    n_inliers: usize,
}

impl Default for RansacRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl RansacRegressor {
    /// Residual slack so points on an exactly interpolated line stay inliers.
    const INLIER_SLACK: f64 = 1e-9;

    /// Creates an unfitted model with the default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_trials: 100,
            min_samples: None,
            residual_threshold: None,
            random_state: 0,
            estimator: None,
            n_inliers: 0,
        }
    }

    /// Sets the number of random subsets to try.
    #[must_use]
    pub fn with_max_trials(mut self, max_trials: usize) -> Self {
        self.max_trials = max_trials;
        self
    }

    /// Sets the subset size.
    #[must_use]
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = Some(min_samples);
        self
    }

    /// Sets the absolute residual bound for inliers.
    #[must_use]
    pub fn with_residual_threshold(mut self, threshold: f64) -> Self {
        self.residual_threshold = Some(threshold);
        self
    }

    /// Sets the sampling seed.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Coefficients of the consensus model, `None` before fit.
    #[must_use]
    pub fn coefficients(&self) -> Option<&Vector> {
        self.estimator.as_ref().and_then(LinearRegression::coefficients)
    }

    /// Intercept of the consensus model (0 before fit).
    #[must_use]
    pub fn intercept(&self) -> f64 {
        self.estimator.as_ref().map_or(0.0, LinearRegression::intercept)
    }

    /// Size of the consensus set from the last fit.
    #[must_use]
    pub fn n_inliers(&self) -> usize {
        self.n_inliers
    }

    /// Returns true if the model has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.estimator.is_some()
    }
}

impl Estimator for RansacRegressor {
    /// # Errors
    ///
    /// Returns insufficient data if there are fewer rows than a subset needs
    /// or no trial produces a consensus set, and a configuration error for a
    /// negative threshold or zero trials.
    fn fit(&mut self, x: &Matrix, y: &Vector) -> Result<()> {
        check_fit_input(x, y)?;
        let (n_samples, n_features) = x.shape();

        if self.max_trials == 0 {
            return Err(BloomError::configuration("RANSAC max_trials must be positive"));
        }
        let min_samples = self.min_samples.unwrap_or(n_features + 1);
        if n_samples < min_samples {
            return Err(BloomError::insufficient_data(
                "RANSAC minimal subset",
                min_samples,
                n_samples,
            ));
        }
        let threshold = match self.residual_threshold {
            Some(threshold) => threshold,
            None => median_absolute_deviation(y),
        };
        if !(threshold >= 0.0 && threshold.is_finite()) {
            return Err(BloomError::configuration(format!(
                "RANSAC residual threshold must be finite and non-negative, got {threshold}"
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.random_state);
        let mut best: Option<(Vec<usize>, f64)> = None;

        for trial in 0..self.max_trials {
            let subset = index::sample(&mut rng, n_samples, min_samples).into_vec();
            let mut candidate = LinearRegression::new();
            if let Err(err) = candidate.fit(&x.select_rows(&subset), &y.select(&subset)) {
                debug!(trial, %err, "skipping degenerate subset");
                continue;
            }

            let predictions = candidate.predict(x)?;
            let inliers: Vec<usize> = (0..n_samples)
                .filter(|&i| (y[i] - predictions[i]).abs() <= threshold + Self::INLIER_SLACK)
                .collect();
            if inliers.is_empty() {
                continue;
            }
            let score = r_squared(&predictions.select(&inliers), &y.select(&inliers));

            let improved = match &best {
                None => true,
                Some((best_inliers, best_score)) => {
                    inliers.len() > best_inliers.len()
                        || (inliers.len() == best_inliers.len() && score > *best_score)
                }
            };
            if improved {
                best = Some((inliers, score));
            }
            if best.as_ref().is_some_and(|(set, _)| set.len() == n_samples) {
                break;
            }
        }

        let (inliers, _) = best.ok_or_else(|| {
            BloomError::insufficient_data("RANSAC consensus set", min_samples, 0)
        })?;
        debug!(n_inliers = inliers.len(), n_samples, threshold, "ransac consensus");

        let mut estimator = LinearRegression::new();
        estimator.fit(&x.select_rows(&inliers), &y.select(&inliers))?;
        self.n_inliers = inliers.len();
        self.estimator = Some(estimator);
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vector> {
        let estimator = self.estimator.as_ref().ok_or(BloomError::NotFitted {
            what: "RANSACRegressor",
        })?;
        linear_predict(estimator.coefficients(), estimator.intercept(), x, "RANSACRegressor")
    }
}

/// `median(|y - median(y)|)`.
fn median_absolute_deviation(y: &Vector) -> f64 {
    let center = median(&mut y.as_slice().to_vec());
    let mut deviations: Vec<f64> = y.iter().map(|v| (v - center).abs()).collect();
    median(&mut deviations)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// y = 2x + 1 on x = 0..20 with four targets shifted by +50.
    fn line_with_outliers() -> (Matrix, Vector) {
        let x = Matrix::from_vec(20, 1, (0..20).map(f64::from).collect()).expect("20x1");
        let y = (0..20)
            .map(|i| {
                let clean = 2.0 * f64::from(i) + 1.0;
                if [3, 8, 13, 17].contains(&i) {
                    clean + 50.0
                } else {
                    clean
                }
            })
            .collect();
        (x, y)
    }

    #[test]
    fn test_huber_resists_outliers() {
        let (x, y) = line_with_outliers();

        let mut ols = LinearRegression::new();
        ols.fit(&x, &y).expect("fits");
        let mut huber = HuberRegressor::new();
        huber.fit(&x, &y).expect("fits");

        let ols_err = (ols.coefficients().expect("fitted")[0] - 2.0).abs();
        let huber_err = (huber.coefficients().expect("fitted")[0] - 2.0).abs();
        assert!(huber_err < 0.05, "huber slope error {huber_err}");
        assert!(huber_err < ols_err);
        assert!((huber.intercept() - 1.0).abs() < 0.5);
        assert!(huber.n_iter() >= 1);
    }

    #[test]
    fn test_huber_matches_ols_on_clean_data() {
        let x = Matrix::from_vec(5, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0]).expect("5x1");
        let y = Vector::from_slice(&[2.9, 5.1, 7.0, 8.9, 11.1]);

        let mut huber = HuberRegressor::new().with_epsilon(100.0).with_alpha(0.0);
        huber.fit(&x, &y).expect("fits");
        let mut ols = LinearRegression::new();
        ols.fit(&x, &y).expect("fits");

        let a = huber.coefficients().expect("fitted")[0];
        let b = ols.coefficients().expect("fitted")[0];
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_huber_rejects_small_epsilon() {
        let (x, y) = line_with_outliers();
        let result = HuberRegressor::new().with_epsilon(0.5).fit(&x, &y);
        assert!(matches!(result, Err(BloomError::Configuration { .. })));
    }

    #[test]
    fn test_ransac_finds_clean_consensus() {
        let (x, y) = line_with_outliers();
        let mut model = RansacRegressor::new();
        model.fit(&x, &y).expect("fits");

        assert_eq!(model.n_inliers(), 16);
        assert!((model.coefficients().expect("fitted")[0] - 2.0).abs() < 1e-9);
        assert!((model.intercept() - 1.0).abs() < 1e-9);

        let pred = model.predict(&Matrix::from_vec(1, 1, vec![30.0]).expect("1x1")).expect("fitted");
        assert!((pred[0] - 61.0).abs() < 1e-9);
    }

    #[test]
    fn test_ransac_is_reproducible() {
        let (x, y) = line_with_outliers();
        let mut a = RansacRegressor::new().with_random_state(7).with_max_trials(5);
        let mut b = RansacRegressor::new().with_random_state(7).with_max_trials(5);
        a.fit(&x, &y).expect("fits");
        b.fit(&x, &y).expect("fits");
        assert_eq!(a, b);
    }

    #[test]
    fn test_ransac_needs_minimal_subset() {
        let x = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).expect("2x2");
        let y = Vector::from_slice(&[1.0, 2.0]);
        let result = RansacRegressor::new().fit(&x, &y);
        assert!(matches!(result, Err(BloomError::InsufficientData { .. })));
    }

    #[test]
    fn test_median_absolute_deviation() {
        let y = Vector::from_slice(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        assert_eq!(median_absolute_deviation(&y), 1.0);
    }
}
