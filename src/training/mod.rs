//! End-to-end training: label, split, scale, compare models, keep the best.
//!
//! Every configured model kind is tuned by cross-validated grid search on
//! the scaled train slice, refit with its best parameters, and scored on
//! the test slice with clamped predictions. Candidates are ranked by
//! ascending test MAE; the winner is evaluated record by record and stored
//! as a [`ModelArtifact`].

mod artifact;

pub use artifact::ModelArtifact;

use crate::calendar::BloomCalendar;
use crate::config::PipelineConfig;
use crate::data::{load_bloom_calendar, FeatureTable};
use crate::error::{BloomError, Result};
use crate::evaluation::{clamp_days, write_records_to, Evaluation, Evaluator, OutputFormat};
use crate::labeling::TargetLabeler;
use crate::linear_model::{ModelKind, Params, Regressor};
use crate::metrics::RegressionReport;
use crate::model_selection::{grid_search, split_and_scale, KFold, ParamGrid, Scoring, TemporalSplit};
use crate::primitives::Vector;
use crate::traits::Estimator;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Test-slice scores of one tuned model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    /// Model family.
    pub kind: ModelKind,
    /// Parameters chosen by grid search.
    pub params: Params,
    /// Mean CV score of `params`, absent for untuned models.
    pub cv_score: Option<f64>,
    /// MAE, RMSE and R² on the clamped test predictions.
    pub test: RegressionReport,
}

/// A fitted candidate and its report.
#[derive(Debug, Clone)]
pub struct TrainedCandidate {
    /// Model refit on the full train slice.
    pub regressor: Regressor,
    /// Its scores.
    pub report: CandidateReport,
}

/// How candidates are searched.
#[derive(Debug, Clone)]
pub struct ModelSearch {
    /// Model kinds to compare, in tie-break order.
    pub models: Vec<ModelKind>,
    /// Hyperparameter grid.
    pub grid: ParamGrid,
    /// Cross-validator.
    pub cv: KFold,
    /// Grid search scoring rule.
    pub scoring: Scoring,
}

impl ModelSearch {
    /// Search settings from a pipeline config.
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            models: config.models.clone(),
            grid: config.param_grid.clone(),
            cv: config.kfold(),
            scoring: config.scoring,
        }
    }
}

/// Tunes, fits and scores one model kind.
///
/// # Errors
///
/// Propagates grid search and fit failures.
pub fn train_candidate(
    kind: ModelKind,
    split: &TemporalSplit,
    search: &ModelSearch,
) -> Result<TrainedCandidate> {
    let (params, cv_score) = if kind.uses_alpha() {
        let result = grid_search(
            kind,
            &search.grid,
            &split.train_features,
            &split.train_labels,
            &search.cv,
            search.scoring,
        )?;
        (result.best_params, Some(result.best_score))
    } else {
        (Params::default(), None)
    };

    let mut regressor = kind.build(params);
    regressor.fit(&split.train_features, &split.train_labels)?;

    let y_pred: Vector = regressor
        .predict(&split.test_features)?
        .iter()
        .map(|&p| clamp_days(p))
        .collect();
    let test = RegressionReport::compute(&y_pred, &split.test_labels);

    info!(
        model = kind.display_name(),
        alpha = params.alpha,
        l1_ratio = params.l1_ratio,
        mae = test.mae,
        rmse = test.rmse,
        r2 = test.r2,
        "trained candidate"
    );

    Ok(TrainedCandidate {
        regressor,
        report: CandidateReport {
            kind,
            params,
            cv_score,
            test,
        },
    })
}

/// Trains every configured kind and ranks them by ascending test MAE.
///
/// A kind that fails to train is logged and skipped; equal MAEs keep the
/// configured order.
///
/// # Errors
///
/// Returns the first failure if no kind could be trained.
pub fn train_candidates(split: &TemporalSplit, search: &ModelSearch) -> Result<Vec<TrainedCandidate>> {
    let mut trained = Vec::with_capacity(search.models.len());
    let mut first_error = None;

    for &kind in &search.models {
        match train_candidate(kind, split, search) {
            Ok(candidate) => trained.push(candidate),
            Err(err) => {
                warn!(model = kind.display_name(), error = %err, "skipping model");
                first_error.get_or_insert(err);
            }
        }
    }

    if trained.is_empty() {
        return Err(first_error
            .unwrap_or_else(|| BloomError::configuration("no model kinds configured")));
    }

    trained.sort_by(|a, b| a.report.test.mae.total_cmp(&b.report.test.mae));
    Ok(trained)
}

/// Everything a training run produces.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Candidate reports, best first.
    pub candidates: Vec<CandidateReport>,
    /// Best model with its scaler.
    pub artifact: ModelArtifact,
    /// Per-record evaluation of the best model on the test slice.
    pub evaluation: Evaluation,
}

impl TrainingOutcome {
    /// Report of the selected model.
    #[must_use]
    pub fn best(&self) -> &CandidateReport {
        // train_candidates never returns an empty list
        &self.candidates[0]
    }
}

/// Runs labeling, splitting and model comparison on in-memory inputs.
///
/// # Errors
///
/// Returns the first labeling, split or training failure.
pub fn train(
    table: &FeatureTable,
    calendar: &BloomCalendar,
    config: &PipelineConfig,
) -> Result<TrainingOutcome> {
    let labels = TargetLabeler::new(calendar).label_vector(&table.reference_dates())?;
    let features = table.design_matrix()?;

    let split = split_and_scale(&features, &labels, config.test_size, config.scaler)?;
    info!(
        train = split.n_train(),
        test = split.n_test(),
        scaler = %config.scaler,
        "split observations"
    );

    let search = ModelSearch::from_config(config);
    let mut trained = train_candidates(&split, &search)?;
    let candidates: Vec<CandidateReport> = trained.iter().map(|c| c.report).collect();
    let best = trained.swap_remove(0);
    debug!(model = best.report.kind.display_name(), "selected best model");

    let dates = table.reference_dates();
    let predictions = best.regressor.predict(&split.test_features)?;
    let evaluation = Evaluator::new(calendar).evaluate(&dates[split.split_index..], &predictions)?;

    let artifact = ModelArtifact::new(
        best.regressor,
        split.scaler,
        table.schema(),
        best.report.params,
        config.test_size,
    )?;

    Ok(TrainingOutcome {
        candidates,
        artifact,
        evaluation,
    })
}

/// Where a pipeline run wrote its outputs.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// In-memory results.
    pub outcome: TrainingOutcome,
    /// Saved model artifact.
    pub artifact_path: PathBuf,
    /// Saved prediction records.
    pub results_path: PathBuf,
}

/// Loads the configured inputs, trains, and writes the artifact and the
/// prediction records.
///
/// # Errors
///
/// Returns the first configuration, I/O, parse, or training failure.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineRun> {
    config.validate()?;

    let table = FeatureTable::from_csv_path(&config.feature_file, config.schema()?)?;
    let calendar = load_bloom_calendar(&config.bloom_file, &config.bloom_date_column)?;

    let outcome = train(&table, &calendar, config)?;

    let artifact_path = config.artifact_path();
    outcome.artifact.save(&artifact_path)?;

    let results_path = config.results_path();
    if let Some(parent) = results_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_records_to(
        Some(results_path.as_path()),
        &outcome.evaluation.records,
        OutputFormat::Json,
    )?;

    info!(
        best = outcome.best().kind.display_name(),
        mae = outcome.evaluation.summary.mean_abs_error,
        "pipeline finished"
    );
    Ok(PipelineRun {
        outcome,
        artifact_path,
        results_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FeatureSchema, Observation};
    use chrono::{Duration, NaiveDate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    /// Weekly samples whose single feature is exactly the days to the next
    /// April 1 bloom.
    fn seasonal_fixture() -> (FeatureTable, BloomCalendar) {
        let calendar = BloomCalendar::new([date(2022, 4, 1), date(2023, 4, 1), date(2024, 4, 1)])
            .expect("non-empty");
        let start = date(2022, 4, 8);
        let observations = (0..80)
            .map(|week| {
                let d = start + Duration::days(7 * week);
                let days = calendar.days_until_next_bloom(d).expect("covered") as f64;
                Observation::new(d, [("signal", days), ("noise", (week % 5) as f64)])
            })
            .collect();
        let schema = FeatureSchema::with_features(["signal", "noise"]).expect("valid");
        let table = FeatureTable::new(schema, observations).expect("complete rows");
        (table, calendar)
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            features: vec!["signal".into(), "noise".into()],
            models: vec![ModelKind::Lasso, ModelKind::Linear, ModelKind::Ridge],
            cv_folds: 3,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_candidates_ranked_by_mae() {
        let (table, calendar) = seasonal_fixture();
        let outcome = train(&table, &calendar, &config()).expect("trains");

        assert_eq!(outcome.candidates.len(), 3);
        for pair in outcome.candidates.windows(2) {
            assert!(pair[0].test.mae <= pair[1].test.mae);
        }
        // Exact linear signal: OLS reproduces it
        assert_eq!(outcome.best().kind, ModelKind::Linear);
        assert!(outcome.best().test.mae < 1e-6);
        assert!(outcome.best().cv_score.is_none());
    }

    #[test]
    fn test_full_model_lineup_trains() {
        let (table, calendar) = seasonal_fixture();
        let cfg = PipelineConfig {
            models: ModelKind::ALL.to_vec(),
            ..config()
        };
        let outcome = train(&table, &calendar, &cfg).expect("trains");

        assert_eq!(outcome.candidates.len(), ModelKind::ALL.len());
        assert!(outcome.best().test.mae < 1e-6);
        for report in &outcome.candidates {
            assert_eq!(report.cv_score.is_some(), report.kind.uses_alpha());
        }
    }

    #[test]
    fn test_evaluation_covers_test_slice() {
        let (table, calendar) = seasonal_fixture();
        let outcome = train(&table, &calendar, &config()).expect("trains");
        // floor(80 * 0.8) = 64
        assert_eq!(outcome.evaluation.records.len(), 16);
        assert_eq!(
            outcome.evaluation.records[0].reference_date,
            table.reference_dates()[64]
        );
        assert!(outcome.evaluation.summary.max_abs_error < 1e-6);
    }

    #[test]
    fn test_failed_kinds_are_skipped() {
        let (table, calendar) = seasonal_fixture();
        let mut cfg = config();
        cfg.models = vec![ModelKind::Ridge, ModelKind::Linear];
        cfg.param_grid.alphas = vec![-1.0];

        // Invalid grid fails Ridge; Linear still trains
        let outcome = train(&table, &calendar, &cfg).expect("linear survives");
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.best().kind, ModelKind::Linear);
    }

    #[test]
    fn test_all_failures_surface_first_error() {
        let (table, calendar) = seasonal_fixture();
        let mut cfg = config();
        cfg.models = vec![ModelKind::Ridge];
        cfg.cv_folds = 1000;
        let result = train(&table, &calendar, &cfg);
        assert!(matches!(result, Err(BloomError::Configuration { .. })));
    }

    #[test]
    fn test_artifact_matches_split() {
        let (table, calendar) = seasonal_fixture();
        let outcome = train(&table, &calendar, &config()).expect("trains");
        let reevaluated = outcome
            .artifact
            .evaluate(&table, &calendar, 0.2)
            .expect("same split");
        assert_eq!(reevaluated.records, outcome.evaluation.records);
    }
}
