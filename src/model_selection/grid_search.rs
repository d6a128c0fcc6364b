use super::cross_validation::{cross_validate, KFold, Scoring};
use crate::error::{BloomError, Result};
use crate::linear_model::{ModelKind, Params};
use crate::primitives::{Matrix, Vector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Hyperparameter values to search.
///
/// `alphas` is shared by every penalized model unless `model_alphas` names
/// a list for that kind.
///
/// ```
/// use bloomcast::linear_model::ModelKind;
/// use bloomcast::model_selection::ParamGrid;
///
/// let grid: ParamGrid = serde_json::from_str(
///     r#"{ "alphas": [0.1, 1.0], "model_alphas": { "lasso": [0.001, 0.01] } }"#,
/// )
/// .expect("valid grid");
/// assert_eq!(grid.alphas_for(ModelKind::Ridge), &[0.1, 1.0]);
/// assert_eq!(grid.alphas_for(ModelKind::Lasso), &[0.001, 0.01]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    /// Penalty strengths (Ridge, Lasso, ElasticNet).
    pub alphas: Vec<f64>,
    /// Per-kind penalty strengths, replacing `alphas` for that kind.
    pub model_alphas: BTreeMap<ModelKind, Vec<f64>>,
    /// L1 shares (ElasticNet only).
    pub l1_ratios: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            alphas: vec![0.01, 0.1, 0.2, 0.5, 1.0, 10.0],
            model_alphas: BTreeMap::new(),
            l1_ratios: vec![0.2, 0.5, 0.8],
        }
    }
}

impl ParamGrid {
    /// Checks every value the search could use.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for empty lists, negative or non-finite
    /// alphas, and l1 ratios outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        check_alphas("param_grid.alphas", &self.alphas)?;
        for (kind, alphas) in &self.model_alphas {
            if !kind.uses_alpha() {
                return Err(BloomError::configuration(format!(
                    "param_grid.model_alphas.{kind}: model has no alpha to search"
                )));
            }
            check_alphas(&format!("param_grid.model_alphas.{kind}"), alphas)?;
        }
        if self.l1_ratios.is_empty() {
            return Err(BloomError::configuration("param_grid.l1_ratios is empty"));
        }
        if let Some(bad) = self.l1_ratios.iter().find(|r| !(0.0..=1.0).contains(*r)) {
            return Err(BloomError::configuration(format!(
                "param_grid.l1_ratios must lie in [0, 1], got {bad}"
            )));
        }
        Ok(())
    }

    /// Penalty strengths searched for `kind`.
    #[must_use]
    pub fn alphas_for(&self, kind: ModelKind) -> &[f64] {
        self.model_alphas.get(&kind).unwrap_or(&self.alphas)
    }

    /// Parameter combinations for `kind`, alpha-major.
    ///
    /// Models without searched hyperparameters get a single default entry.
    #[must_use]
    pub fn candidates(&self, kind: ModelKind) -> Vec<Params> {
        let alphas = self.alphas_for(kind);
        if kind.uses_l1_ratio() {
            alphas
                .iter()
                .flat_map(|&alpha| {
                    self.l1_ratios
                        .iter()
                        .map(move |&l1_ratio| Params { alpha, l1_ratio })
                })
                .collect()
        } else if kind.uses_alpha() {
            alphas.iter().map(|&alpha| Params::with_alpha(alpha)).collect()
        } else {
            vec![Params::default()]
        }
    }
}

fn check_alphas(field: &str, alphas: &[f64]) -> Result<()> {
    if alphas.is_empty() {
        return Err(BloomError::configuration(format!("{field} is empty")));
    }
    if let Some(bad) = alphas.iter().find(|a| !(a.is_finite() && **a >= 0.0)) {
        return Err(BloomError::configuration(format!(
            "{field} must be finite and non-negative, got {bad}"
        )));
    }
    Ok(())
}

/// One evaluated grid point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    /// Parameters tried.
    pub params: Params,
    /// Mean cross-validation score.
    pub mean_score: f64,
    /// Standard deviation across folds.
    pub std_score: f64,
}

/// Outcome of [`grid_search`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearchResult {
    /// Model family searched.
    pub kind: ModelKind,
    /// Highest-scoring parameters (first listed wins ties).
    pub best_params: Params,
    /// Mean CV score of `best_params`.
    pub best_score: f64,
    /// Every grid point in search order.
    pub points: Vec<GridPoint>,
}

/// Exhaustively cross-validates every parameter combination for `kind`.
///
/// # Errors
///
/// Returns a configuration error for an invalid grid or fold count, or
/// propagates the first fit failure.
///
/// # Example
///
/// ```
/// use bloomcast::linear_model::ModelKind;
/// use bloomcast::model_selection::{grid_search, KFold, ParamGrid, Scoring};
/// use bloomcast::primitives::{Matrix, Vector};
///
/// let x = Matrix::from_vec(30, 1, (0..30).map(f64::from).collect()).expect("30x1");
/// let y: Vector = (0..30).map(|i| 2.0 * f64::from(i) + 1.0).collect();
///
/// let grid = ParamGrid { alphas: vec![100.0, 0.001], l1_ratios: vec![0.5], ..ParamGrid::default() };
/// let result = grid_search(ModelKind::Lasso, &grid, &x, &y, &KFold::new(3), Scoring::NegMeanAbsoluteError)
///     .expect("valid grid");
/// assert_eq!(result.best_params.alpha, 0.001);
/// ```
pub fn grid_search(
    kind: ModelKind,
    grid: &ParamGrid,
    x: &Matrix,
    y: &Vector,
    cv: &KFold,
    scoring: Scoring,
) -> Result<GridSearchResult> {
    grid.validate()?;

    let mut points = Vec::new();
    let mut best: Option<(Params, f64)> = None;

    for params in grid.candidates(kind) {
        let estimator = kind.build(params);
        let cv_result = cross_validate(&estimator, x, y, cv, scoring)?;
        let mean_score = cv_result.mean();

        debug!(
            model = %kind,
            alpha = params.alpha,
            l1_ratio = params.l1_ratio,
            score = mean_score,
            "grid point"
        );

        // NaN never beats anything, equal scores keep the earlier point
        let improved = match best {
            None => !mean_score.is_nan(),
            Some((_, best_score)) => mean_score > best_score,
        };
        if improved {
            best = Some((params, mean_score));
        }

        points.push(GridPoint {
            params,
            mean_score,
            std_score: cv_result.std(),
        });
    }

    let (best_params, best_score) = best.ok_or_else(|| {
        BloomError::configuration(format!("grid search for {kind} produced no finite score"))
    })?;

    Ok(GridSearchResult {
        kind,
        best_params,
        best_score,
        points,
    })
}
