//! Linear models for regression.
//!
//! Includes Ordinary Least Squares, Ridge (L2), Lasso (L1), Elastic Net
//! (L1 + L2), Bayesian ridge, and the outlier-robust Huber and RANSAC
//! regressors. [`Regressor`] wraps any of them behind one serializable type
//! so a trained model can be stored next to its scaler.

mod bayesian_ridge;
mod elastic_net;
mod ridge;
mod robust;

pub use bayesian_ridge::BayesianRidge;
pub use elastic_net::{ElasticNet, Lasso};
pub use ridge::Ridge;
pub use robust::{HuberRegressor, RansacRegressor};

use crate::error::{BloomError, Result};
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordinary Least Squares (OLS) linear regression.
///
/// # Solver
///
/// Uses normal equations: `β = (X^T X)^-1 X^T y` via Cholesky decomposition.
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
///
/// let predictions = model.predict(&x).expect("fitted");
/// assert!((predictions[0] - 3.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Coefficients for features (excluding intercept).
    coefficients: Option<Vector>,
    /// Intercept (bias) term.
    intercept: f64,
    /// Whether to fit an intercept.
    fit_intercept: bool,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    /// Creates a new unfitted model that fits an intercept.
    #[must_use]
    pub fn new() -> Self {
        Self {
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

impl Estimator for LinearRegression {
    /// Fits the model using normal equations.
    ///
    /// # Errors
    ///
    /// Returns an error if dimensions don't match, there are fewer samples
    /// than parameters, or `X^T X` is singular.
    fn fit(&mut self, x: &Matrix, y: &Vector) -> Result<()> {
        check_fit_input(x, y)?;
        let (n_samples, n_features) = x.shape();

        let required = if self.fit_intercept {
            n_features + 1
        } else {
            n_features
        };
        if n_samples < required {
            return Err(BloomError::insufficient_data(
                "LinearRegression::fit (samples >= parameters)",
                required,
                n_samples,
            ));
        }

        let (intercept, coefficients) = solve_normal_equations(x, y, 0.0, self.fit_intercept)?;
        self.intercept = intercept;
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vector> {
        linear_predict(self.coefficients.as_ref(), self.intercept, x, "LinearRegression")
    }
}

/// Solves `(X^T X + αI) β = X^T y`; the intercept term is never penalized.
fn solve_normal_equations(
    x: &Matrix,
    y: &Vector,
    alpha: f64,
    fit_intercept: bool,
) -> Result<(f64, Vector)> {
    solve_weighted_normal_equations(x, y, None, alpha, fit_intercept)
}

/// Solves `(X^T W X + αI) β = X^T W y` with `W = diag(weights)`.
///
/// Rows and targets are scaled by `sqrt(w_i)`; without weights this is
/// plain penalized least squares.
fn solve_weighted_normal_equations(
    x: &Matrix,
    y: &Vector,
    weights: Option<&[f64]>,
    alpha: f64,
    fit_intercept: bool,
) -> Result<(f64, Vector)> {
    let mut x_design = if fit_intercept {
        x.with_intercept_column()
    } else {
        x.clone()
    };

    let target = match weights {
        Some(weights) => {
            if weights.len() != y.len() {
                return Err(BloomError::dimension_mismatch("weights", y.len(), weights.len()));
            }
            let n_cols = x_design.n_cols();
            for (i, &w) in weights.iter().enumerate() {
                let root = w.sqrt();
                for j in 0..n_cols {
                    let value = x_design.get(i, j);
                    x_design.set(i, j, value * root);
                }
            }
            weights.iter().zip(y).map(|(w, v)| w.sqrt() * v).collect()
        }
        None => y.clone(),
    };
    let y = &target;

    let xt = x_design.transpose();
    let mut xtx = xt.matmul(&x_design)?;
    if alpha > 0.0 {
        let first_penalized = usize::from(fit_intercept);
        for i in first_penalized..xtx.n_rows() {
            let current = xtx.get(i, i);
            xtx.set(i, i, current + alpha);
        }
    }
    let xty = xt.matvec(y)?;
    let beta = xtx.cholesky_solve(&xty)?;

    if fit_intercept {
        Ok((beta[0], beta.slice(1..beta.len())))
    } else {
        Ok((0.0, beta))
    }
}

fn check_fit_input(x: &Matrix, y: &Vector) -> Result<()> {
    if x.n_rows() != y.len() {
        return Err(BloomError::dimension_mismatch("n_samples", x.n_rows(), y.len()));
    }
    if x.n_rows() == 0 {
        return Err(BloomError::insufficient_data("model fit", 1, 0));
    }
    Ok(())
}

/// Middle value of `values` (mean of the two middle values for even lengths).
///
/// `values` is reordered. Returns 0 for an empty slice.
fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn linear_predict(
    coefficients: Option<&Vector>,
    intercept: f64,
    x: &Matrix,
    what: &'static str,
) -> Result<Vector> {
    let coefficients = coefficients.ok_or(BloomError::NotFitted { what })?;
    Ok(x.matvec(coefficients)?.add_scalar(intercept))
}

/// Regression model family.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Ordinary least squares.
    Linear,
    /// L2-penalized least squares.
    Ridge,
    /// L1-penalized least squares.
    Lasso,
    /// Mixed L1/L2 penalty.
    ElasticNet,
    /// Ridge with noise and weight precisions estimated from the data.
    BayesianRidge,
    /// Huber-loss regression.
    Huber,
    /// Random sample consensus around OLS.
    Ransac,
}

impl ModelKind {
    /// All kinds in a stable order.
    pub const ALL: [Self; 7] = [
        Self::Linear,
        Self::Ridge,
        Self::Lasso,
        Self::ElasticNet,
        Self::BayesianRidge,
        Self::Huber,
        Self::Ransac,
    ];

    /// Config/CLI name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Ridge => "ridge",
            Self::Lasso => "lasso",
            Self::ElasticNet => "elastic_net",
            Self::BayesianRidge => "bayesian_ridge",
            Self::Huber => "huber",
            Self::Ransac => "ransac",
        }
    }

    /// Display name used in reports.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Linear => "LinearRegression",
            Self::Ridge => "Ridge",
            Self::Lasso => "Lasso",
            Self::ElasticNet => "ElasticNet",
            Self::BayesianRidge => "BayesianRidge",
            Self::Huber => "HuberRegressor",
            Self::Ransac => "RANSACRegressor",
        }
    }

    /// True if the model has a searched `alpha` hyperparameter.
    #[must_use]
    pub fn uses_alpha(self) -> bool {
        matches!(self, Self::Ridge | Self::Lasso | Self::ElasticNet)
    }

    /// True if the model has an `l1_ratio` hyperparameter.
    #[must_use]
    pub fn uses_l1_ratio(self) -> bool {
        matches!(self, Self::ElasticNet)
    }

    /// Builds an unfitted model of this kind.
    #[must_use]
    pub fn build(self, params: Params) -> Regressor {
        match self {
            Self::Linear => Regressor::Linear(LinearRegression::new()),
            Self::Ridge => Regressor::Ridge(Ridge::new(params.alpha)),
            Self::Lasso => Regressor::Lasso(Lasso::new(params.alpha)),
            Self::ElasticNet => {
                Regressor::ElasticNet(ElasticNet::new(params.alpha, params.l1_ratio))
            }
            Self::BayesianRidge => Regressor::BayesianRidge(BayesianRidge::new()),
            Self::Huber => Regressor::Huber(HuberRegressor::new()),
            Self::Ransac => Regressor::Ransac(RansacRegressor::new()),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = BloomError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "linear" | "linear_regression" | "ols" => Ok(Self::Linear),
            "ridge" => Ok(Self::Ridge),
            "lasso" => Ok(Self::Lasso),
            "elastic_net" | "elasticnet" => Ok(Self::ElasticNet),
            "bayesian_ridge" | "bayesianridge" => Ok(Self::BayesianRidge),
            "huber" | "huber_regressor" | "huberregressor" => Ok(Self::Huber),
            "ransac" | "ransac_regressor" | "ransacregressor" => Ok(Self::Ransac),
            other => Err(BloomError::configuration(format!(
                "unknown model '{other}', expected one of linear, ridge, lasso, elastic_net, \
                 bayesian_ridge, huber, ransac"
            ))),
        }
    }
}

/// Regularization hyperparameters.
///
/// Fields a model kind does not use are ignored by [`ModelKind::build`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Overall penalty strength.
    pub alpha: f64,
    /// Share of the penalty that is L1 (Elastic Net only).
    pub l1_ratio: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            l1_ratio: 0.5,
        }
    }
}

impl Params {
    /// Parameters with the given alpha and the default l1 ratio.
    #[must_use]
    pub fn with_alpha(alpha: f64) -> Self {
        Self {
            alpha,
            ..Self::default()
        }
    }
}

/// Any fitted or unfitted linear model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Regressor {
    /// OLS.
    Linear(LinearRegression),
    /// Ridge.
    Ridge(Ridge),
    /// Lasso.
    Lasso(Lasso),
    /// Elastic Net.
    ElasticNet(ElasticNet),
    /// Bayesian ridge.
    BayesianRidge(BayesianRidge),
    /// Huber.
    Huber(HuberRegressor),
    /// RANSAC.
    Ransac(RansacRegressor),
}

impl Regressor {
    /// The family this model belongs to.
    #[must_use]
    pub fn kind(&self) -> ModelKind {
        match self {
            Self::Linear(_) => ModelKind::Linear,
            Self::Ridge(_) => ModelKind::Ridge,
            Self::Lasso(_) => ModelKind::Lasso,
            Self::ElasticNet(_) => ModelKind::ElasticNet,
            Self::BayesianRidge(_) => ModelKind::BayesianRidge,
            Self::Huber(_) => ModelKind::Huber,
            Self::Ransac(_) => ModelKind::Ransac,
        }
    }

    /// Returns true if the model has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        match self {
            Self::Linear(m) => m.is_fitted(),
            Self::Ridge(m) => m.is_fitted(),
            Self::Lasso(m) => m.is_fitted(),
            Self::ElasticNet(m) => m.is_fitted(),
            Self::BayesianRidge(m) => m.is_fitted(),
            Self::Huber(m) => m.is_fitted(),
            Self::Ransac(m) => m.is_fitted(),
        }
    }

    /// Fitted coefficients, `None` before fit.
    #[must_use]
    pub fn coefficients(&self) -> Option<&Vector> {
        match self {
            Self::Linear(m) => m.coefficients(),
            Self::Ridge(m) => m.coefficients(),
            Self::Lasso(m) => m.coefficients(),
            Self::ElasticNet(m) => m.coefficients(),
            Self::BayesianRidge(m) => m.coefficients(),
            Self::Huber(m) => m.coefficients(),
            Self::Ransac(m) => m.coefficients(),
        }
    }
}

impl Estimator for Regressor {
    fn fit(&mut self, x: &Matrix, y: &Vector) -> Result<()> {
        match self {
            Self::Linear(m) => m.fit(x, y),
            Self::Ridge(m) => m.fit(x, y),
            Self::Lasso(m) => m.fit(x, y),
            Self::ElasticNet(m) => m.fit(x, y),
            Self::BayesianRidge(m) => m.fit(x, y),
            Self::Huber(m) => m.fit(x, y),
            Self::Ransac(m) => m.fit(x, y),
        }
    }

    fn predict(&self, x: &Matrix) -> Result<Vector> {
        match self {
            Self::Linear(m) => m.predict(x),
            Self::Ridge(m) => m.predict(x),
            Self::Lasso(m) => m.predict(x),
            Self::ElasticNet(m) => m.predict(x),
            Self::BayesianRidge(m) => m.predict(x),
            Self::Huber(m) => m.predict(x),
            Self::Ransac(m) => m.predict(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_regression() {
        let x = Matrix::from_vec(4, 1, vec![1.0, 2.0, 3.0, 4.0]).expect("4x1");
        let y = Vector::from_slice(&[3.0, 5.0, 7.0, 9.0]);

        let mut model = LinearRegression::new();
        model.fit(&x, &y).expect("fits");

        let coef = model.coefficients().expect("fitted");
        assert!((coef[0] - 2.0).abs() < 1e-9);
        assert!((model.intercept() - 1.0).abs() < 1e-9);
        assert!((model.score(&x, &y).expect("fitted") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_multivariate_regression() {
        // y = 1 + 2*x1 + 3*x2
        let x = Matrix::from_vec(
            4,
            2,
            vec![1.0, 1.0, 2.0, 1.0, 1.0, 2.0, 3.0, 3.0],
        )
        .expect("4x2");
        let y = Vector::from_slice(&[6.0, 8.0, 9.0, 16.0]);

        let mut model = LinearRegression::new();
        model.fit(&x, &y).expect("fits");
        let coef = model.coefficients().expect("fitted");
        assert!((coef[0] - 2.0).abs() < 1e-9);
        assert!((coef[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_intercept() {
        let x = Matrix::from_vec(3, 1, vec![1.0, 2.0, 3.0]).expect("3x1");
        let y = Vector::from_slice(&[2.0, 4.0, 6.0]);
        let mut model = LinearRegression::new().with_intercept(false);
        model.fit(&x, &y).expect("fits");
        assert_eq!(model.intercept(), 0.0);
        assert!((model.coefficients().expect("fitted")[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_underdetermined_rejected() {
        let x = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).expect("2x2");
        let y = Vector::from_slice(&[1.0, 2.0]);
        let result = LinearRegression::new().fit(&x, &y);
        assert!(matches!(result, Err(BloomError::InsufficientData { .. })));
    }

    #[test]
    fn test_dimension_mismatch() {
        let x = Matrix::from_vec(3, 1, vec![1.0, 2.0, 3.0]).expect("3x1");
        let y = Vector::from_slice(&[1.0, 2.0]);
        let result = LinearRegression::new().fit(&x, &y);
        assert!(matches!(result, Err(BloomError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_predict_before_fit() {
        let x = Matrix::from_vec(1, 1, vec![1.0]).expect("1x1");
        let result = LinearRegression::new().predict(&x);
        assert!(matches!(result, Err(BloomError::NotFitted { .. })));
    }

    #[test]
    fn test_predict_wrong_width() {
        let x = Matrix::from_vec(3, 1, vec![1.0, 2.0, 3.0]).expect("3x1");
        let y = Vector::from_slice(&[1.0, 2.0, 3.0]);
        let mut model = LinearRegression::new();
        model.fit(&x, &y).expect("fits");

        let wide = Matrix::zeros(1, 2);
        assert!(matches!(
            model.predict(&wide),
            Err(BloomError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_model_kind_names() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.as_str().parse::<ModelKind>().expect("roundtrip"), kind);
        }
        assert_eq!("ElasticNet".parse::<ModelKind>().expect("alias"), ModelKind::ElasticNet);
        assert_eq!("HuberRegressor".parse::<ModelKind>().expect("alias"), ModelKind::Huber);
        assert_eq!("RANSACRegressor".parse::<ModelKind>().expect("alias"), ModelKind::Ransac);
        assert!("svr".parse::<ModelKind>().is_err());
    }

    #[test]
    fn test_model_kind_build() {
        let params = Params {
            alpha: 0.2,
            l1_ratio: 0.8,
        };
        match ModelKind::ElasticNet.build(params) {
            Regressor::ElasticNet(m) => {
                assert_eq!(m.alpha(), 0.2);
                assert_eq!(m.l1_ratio(), 0.8);
            }
            other => panic!("unexpected model {other:?}"),
        }
        assert_eq!(ModelKind::Ridge.build(params).kind(), ModelKind::Ridge);
        assert!(!ModelKind::Linear.uses_alpha());
        assert!(!ModelKind::Huber.uses_alpha());
        assert!(ModelKind::ElasticNet.uses_l1_ratio());
        for kind in ModelKind::ALL {
            assert_eq!(kind.build(params).kind(), kind);
        }
    }

    #[test]
    fn test_every_kind_fits_a_clean_line() {
        let x = Matrix::from_vec(12, 1, (0..12).map(f64::from).collect()).expect("12x1");
        let y: Vector = (0..12).map(|i| 3.0 * f64::from(i) - 2.0).collect();

        for kind in ModelKind::ALL {
            let mut model = kind.build(Params::with_alpha(0.001));
            model.fit(&x, &y).expect("fits");
            let r2 = model.score(&x, &y).expect("fitted");
            assert!(r2 > 0.99, "{kind} scored {r2}");
        }
    }

    #[test]
    fn test_weighted_solve_ignores_zero_weight_rows() {
        // Last row is an outlier with zero weight
        let x = Matrix::from_vec(4, 1, vec![1.0, 2.0, 3.0, 4.0]).expect("4x1");
        let y = Vector::from_slice(&[3.0, 5.0, 7.0, 100.0]);
        let (intercept, coef) =
            solve_weighted_normal_equations(&x, &y, Some(&[1.0, 1.0, 1.0, 0.0]), 0.0, true)
                .expect("solves");
        assert!((coef[0] - 2.0).abs() < 1e-9);
        assert!((intercept - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&mut []), 0.0);
    }

    #[test]
    fn test_regressor_dispatch() {
        let x = Matrix::from_vec(4, 1, vec![1.0, 2.0, 3.0, 4.0]).expect("4x1");
        let y = Vector::from_slice(&[3.0, 5.0, 7.0, 9.0]);

        let mut model = ModelKind::Linear.build(Params::default());
        assert!(!model.is_fitted());
        model.fit(&x, &y).expect("fits");
        assert!(model.is_fitted());
        let pred = model.predict(&x).expect("fitted");
        assert!((pred[3] - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_regressor_bincode_roundtrip() {
        let x = Matrix::from_vec(3, 1, vec![1.0, 2.0, 3.0]).expect("3x1");
        let y = Vector::from_slice(&[2.0, 4.0, 6.5]);
        let mut model = ModelKind::Ridge.build(Params::with_alpha(0.5));
        model.fit(&x, &y).expect("fits");

        let bytes = bincode::serialize(&model).expect("serializes");
        let restored: Regressor = bincode::deserialize(&bytes).expect("deserializes");
        assert_eq!(restored, model);
    }
}
