use super::{check_fit_input, linear_predict, solve_normal_equations};
use crate::error::Result;
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bayesian ridge regression.
///
/// # Model
///
/// ```text
/// y = Xβ + ε,  ε ~ N(0, α⁻¹I)     # α: noise precision
/// β ~ N(0, λ⁻¹I)                  # λ: weight precision
/// α ~ Gamma(α₁, α₂),  λ ~ Gamma(λ₁, λ₂)
/// ```
///
/// Both precisions are estimated by maximizing the marginal likelihood
/// (MacKay's fixed-point updates). Each step solves a ridge system with
/// penalty `λ/α`, so no penalty has to be searched. The intercept is
/// recovered from the column means and is not penalized.
///
/// # Examples
///
/// ```
/// use bloomcast::prelude::*;
/// use bloomcast::linear_model::BayesianRidge;
///
/// let x = Matrix::from_vec(6, 1, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).expect("6x1");
/// let y = Vector::from_slice(&[1.1, 2.9, 5.0, 7.1, 8.9, 11.0]);
///
/// let mut model = BayesianRidge::new();
/// model.fit(&x, &y).expect("fits");
/// assert!(model.score(&x, &y).expect("fitted") > 0.99);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BayesianRidge {
    max_iter: usize,
    tol: f64,
    /// Gamma prior shape and rate on the noise precision.
    alpha_1: f64,
    alpha_2: f64,
    /// Gamma prior shape and rate on the weight precision.
    lambda_1: f64,
    lambda_2: f64,
    coefficients: Option<Vector>,
    intercept: f64,
    noise_precision: f64,
    weight_precision: f64,
    n_iter: usize,
}

impl Default for BayesianRidge {
    fn default() -> Self {
        Self::new()
    }
}

impl BayesianRidge {
    /// Creates an unfitted model with non-informative Gamma(1e-6, 1e-6) priors.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_iter: 300,
            tol: 1e-3,
            alpha_1: 1e-6,
            alpha_2: 1e-6,
            lambda_1: 1e-6,
            lambda_2: 1e-6,
            coefficients: None,
            intercept: 0.0,
            noise_precision: 0.0,
            weight_precision: 0.0,
            n_iter: 0,
        }
    }

    /// Sets the maximum number of evidence updates.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the convergence tolerance on the summed coefficient change.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
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

    /// Estimated noise precision α.
    #[must_use]
    pub fn noise_precision(&self) -> f64 {
        self.noise_precision
    }

    /// Estimated weight precision λ.
    #[must_use]
    pub fn weight_precision(&self) -> f64 {
        self.weight_precision
    }

    /// Evidence updates run by the last fit.
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

impl Estimator for BayesianRidge {
    /// Alternates ridge solves with precision updates until the coefficients
    /// settle.
    ///
    /// # Errors
    ///
    /// Returns an error if dimensions don't match or a ridge system is
    /// singular.
    fn fit(&mut self, x: &Matrix, y: &Vector) -> Result<()> {
        check_fit_input(x, y)?;
        let (n_samples, n_features) = x.shape();
        let n = n_samples as f64;

        let x_mean: Vec<f64> = (0..n_features).map(|j| x.column(j).mean()).collect();
        let y_mean = y.mean();
        let mut centered = x.clone();
        for i in 0..n_samples {
            for (j, mean) in x_mean.iter().enumerate() {
                centered.set(i, j, x.get(i, j) - mean);
            }
        }
        let y_centered: Vector = y.iter().map(|v| v - y_mean).collect();

        let xtx = centered.transpose().matmul(&centered)?;
        let variance = y_centered.iter().map(|v| v * v).sum::<f64>() / n;

        let mut alpha = 1.0 / (variance + f64::EPSILON);
        let mut lambda = 1.0;
        let mut previous: Option<Vector> = None;
        self.n_iter = 0;

        for _ in 0..self.max_iter {
            let (_, coef) = solve_normal_equations(&centered, &y_centered, lambda / alpha, false)?;
            let predictions = centered.matvec(&coef)?;
            let residual_ss: f64 = y_centered
                .iter()
                .zip(&predictions)
                .map(|(t, p)| (t - p).powi(2))
                .sum();
            let coef_ss: f64 = coef.iter().map(|c| c * c).sum();
            let gamma = effective_parameters(&xtx, alpha, lambda)?;

            lambda = (gamma + 2.0 * self.lambda_1) / (coef_ss + 2.0 * self.lambda_2);
            alpha = (n - gamma + 2.0 * self.alpha_1) / (residual_ss + 2.0 * self.alpha_2);
            self.n_iter += 1;

            let converged = previous.as_ref().is_some_and(|old| {
                old.iter().zip(&coef).map(|(a, b)| (a - b).abs()).sum::<f64>() < self.tol
            });
            if converged {
                break;
            }
            previous = Some(coef);
        }

        let (_, coef) = solve_normal_equations(&centered, &y_centered, lambda / alpha, false)?;
        debug!(
            n_iter = self.n_iter,
            noise_precision = alpha,
            weight_precision = lambda,
            "bayesian ridge converged"
        );

        self.intercept = y_mean - coef.iter().zip(&x_mean).map(|(c, m)| c * m).sum::<f64>();
        self.coefficients = Some(coef);
        self.noise_precision = alpha;
        self.weight_precision = lambda;
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vector> {
        linear_predict(self.coefficients.as_ref(), self.intercept, x, "BayesianRidge")
    }
}

/// `γ = p − λ·tr((λI + αXᵀX)⁻¹)`, the effective number of well-determined
/// parameters.
fn effective_parameters(xtx: &Matrix, alpha: f64, lambda: f64) -> Result<f64> {
    let p = xtx.n_rows();
    let mut precision = Matrix::zeros(p, p);
    for i in 0..p {
        for j in 0..p {
            precision.set(i, j, alpha * xtx.get(i, j));
        }
        precision.set(i, i, precision.get(i, i) + lambda);
    }

    let mut trace = 0.0;
    for i in 0..p {
        let mut unit = Vector::zeros(p);
        unit[i] = 1.0;
        trace += precision.cholesky_solve(&unit)?[i];
    }
    Ok(p as f64 - lambda * trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BloomError;

    fn noisy_plane() -> (Matrix, Vector) {
        // y = 4 + 1.5*x1 - 2*x2 with a small deterministic wobble
        let rows: Vec<Vec<f64>> = (0..30)
            .map(|i| {
                let i = f64::from(i);
                vec![i, (i * 0.7).sin() * 5.0]
            })
            .collect();
        let y = rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let wobble = if i % 2 == 0 { 0.05 } else { -0.05 };
                4.0 + 1.5 * r[0] - 2.0 * r[1] + wobble
            })
            .collect();
        (Matrix::from_rows(&rows).expect("30x2"), y)
    }

    #[test]
    fn test_recovers_coefficients() {
        let (x, y) = noisy_plane();
        let mut model = BayesianRidge::new();
        model.fit(&x, &y).expect("fits");

        let coef = model.coefficients().expect("fitted");
        assert!((coef[0] - 1.5).abs() < 0.01);
        assert!((coef[1] + 2.0).abs() < 0.01);
        assert!((model.intercept() - 4.0).abs() < 0.1);
        assert!(model.n_iter() >= 1);
    }

    #[test]
    fn test_precisions_reflect_noise_level() {
        let (x, y) = noisy_plane();
        let mut model = BayesianRidge::new();
        model.fit(&x, &y).expect("fits");

        // Residual std is about 0.05, so the noise precision is large
        assert!(model.noise_precision() > 100.0);
        assert!(model.weight_precision() > 0.0);
    }

    #[test]
    fn test_effective_parameters_bounds() {
        let xtx = Matrix::from_vec(2, 2, vec![10.0, 0.0, 0.0, 4.0]).expect("2x2");
        let weak_prior = effective_parameters(&xtx, 1.0, 1e-9).expect("pd");
        let strong_prior = effective_parameters(&xtx, 1.0, 1e9).expect("pd");
        assert!((weak_prior - 2.0).abs() < 1e-6);
        assert!(strong_prior.abs() < 1e-6);
    }

    #[test]
    fn test_predict_before_fit() {
        let x = Matrix::zeros(1, 1);
        assert!(matches!(
            BayesianRidge::new().predict(&x),
            Err(BloomError::NotFitted { .. })
        ));
    }
}
