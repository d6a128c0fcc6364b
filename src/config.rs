//! Pipeline configuration.
//!
//! Loaded from JSON; every field has a default, so a partial file only
//! overrides what it names. Relative paths resolve against the working
//! directory.
//!
//! # Example
//!
//! ```
//! use bloomcast::config::PipelineConfig;
//! use bloomcast::preprocessing::ScalerKind;
//!
//! let config = PipelineConfig::from_json(r#"{ "scaler": "standard", "test_size": 0.25 }"#)
//!     .expect("valid config");
//! assert_eq!(config.scaler, ScalerKind::Standard);
//! assert_eq!(config.cv_folds, 5);
//! assert_eq!(config.features.len(), 22);
//! ```

use crate::data::{FeatureSchema, DEFAULT_BLOOM_COLUMN, DEFAULT_DATE_COLUMN};
use crate::error::{BloomError, Result};
use crate::linear_model::ModelKind;
use crate::model_selection::{validate_test_fraction, KFold, ParamGrid, Scoring};
use crate::preprocessing::ScalerKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the saved best model inside `save_dir`.
pub const ARTIFACT_FILE_NAME: &str = "best_model.bin";

/// File name of the evaluated test-slice predictions.
pub const RESULTS_FILE_NAME: &str = "predicted_results.json";

/// File name of the labeled feature export.
pub const LABELED_FILE_NAME: &str = "features_with_targets.csv";

const DEFAULT_FEATURES: [&str; 22] = [
    "EVI",
    "tmax",
    "tmin",
    "dayl",
    "vp",
    "tmax_spring",
    "tmax_summer",
    "tmax_fall",
    "tmax_winter",
    "tmin_spring",
    "tmin_summer",
    "tmin_fall",
    "tmin_winter",
    "prcp_spring",
    "prcp_summer",
    "prcp_fall",
    "prcp_winter",
    "vp_spring",
    "vp_summer",
    "vp_fall",
    "vp_winter",
    "accum_prcp",
];

/// Settings for one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Feature table CSV.
    pub feature_file: PathBuf,
    /// Bloom date list CSV.
    pub bloom_file: PathBuf,
    /// Directory for results and the model directory.
    pub output_dir: PathBuf,
    /// Model directory, relative to `output_dir`.
    pub save_dir: PathBuf,
    /// Reference-date column of the feature table.
    pub date_column: String,
    /// Date column of the bloom list.
    pub bloom_date_column: String,
    /// Feature keys, in design-matrix order.
    pub features: Vec<String>,
    /// Normalization strategy.
    pub scaler: ScalerKind,
    /// Share of trailing rows held out for testing.
    pub test_size: f64,
    /// Folds for hyperparameter search.
    pub cv_folds: usize,
    /// Shuffle seed for the CV folds; unshuffled when absent.
    pub cv_seed: Option<u64>,
    /// Model kinds to compare.
    pub models: Vec<ModelKind>,
    /// Hyperparameter grid.
    pub param_grid: ParamGrid,
    /// Grid search scoring rule.
    pub scoring: Scoring,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feature_file: PathBuf::from("merged.csv"),
            bloom_file: PathBuf::from("bloom_dates.csv"),
            output_dir: PathBuf::from("."),
            save_dir: PathBuf::from("saved_models"),
            date_column: DEFAULT_DATE_COLUMN.to_string(),
            bloom_date_column: DEFAULT_BLOOM_COLUMN.to_string(),
            features: DEFAULT_FEATURES.iter().map(|s| (*s).to_string()).collect(),
            scaler: ScalerKind::MinMax,
            test_size: 0.2,
            cv_folds: 5,
            cv_seed: None,
            models: vec![ModelKind::Ridge, ModelKind::Lasso, ModelKind::ElasticNet],
            param_grid: ParamGrid::default(),
            scoring: Scoring::NegMeanAbsoluteError,
        }
    }
}

impl PipelineConfig {
    /// Reads and validates a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file can't be read, a JSON error if it
    /// doesn't parse, or a configuration error if a value is invalid.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON config file without validating it.
    ///
    /// Use this when values are overridden before [`PipelineConfig::validate`]
    /// runs, as the CLI does with its flags.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file can't be read or a JSON error if it
    /// doesn't parse.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        debug!(path = %path.display(), ?config, "read pipeline config");
        Ok(config)
    }

    /// Parses and validates a JSON config document.
    ///
    /// # Errors
    ///
    /// See [`PipelineConfig::load`].
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field before any data is read.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        validate_test_fraction(self.test_size)?;
        self.schema()?;

        if self.bloom_date_column.trim().is_empty() {
            return Err(BloomError::configuration("bloom_date_column is empty"));
        }
        if self.cv_folds < 2 {
            return Err(BloomError::configuration(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if self.models.is_empty() {
            return Err(BloomError::configuration("models list is empty"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.models.iter().find(|kind| !seen.insert(**kind)) {
            return Err(BloomError::configuration(format!("model '{dup}' listed twice")));
        }
        if self.models.iter().any(|kind| kind.uses_alpha()) {
            self.param_grid.validate()?;
        }
        Ok(())
    }

    /// Feature schema described by `date_column` and `features`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty or duplicated key list.
    pub fn schema(&self) -> Result<FeatureSchema> {
        if self.date_column.trim().is_empty() {
            return Err(BloomError::configuration("date_column is empty"));
        }
        FeatureSchema::new(self.date_column.clone(), self.features.clone())
    }

    /// Cross-validator for the grid search.
    #[must_use]
    pub fn kfold(&self) -> KFold {
        let kfold = KFold::new(self.cv_folds);
        match self.cv_seed {
            Some(seed) => kfold.with_random_state(seed),
            None => kfold,
        }
    }

    /// `<output_dir>/<save_dir>/best_model.bin`.
    #[must_use]
    pub fn artifact_path(&self) -> PathBuf {
        self.output_dir.join(&self.save_dir).join(ARTIFACT_FILE_NAME)
    }

    /// `<output_dir>/predicted_results.json`.
    #[must_use]
    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join(RESULTS_FILE_NAME)
    }

    /// `<output_dir>/features_with_targets.csv`.
    #[must_use]
    pub fn labeled_path(&self) -> PathBuf {
        self.output_dir.join(LABELED_FILE_NAME)
    }
}
