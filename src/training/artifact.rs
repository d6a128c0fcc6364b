use crate::calendar::BloomCalendar;
use crate::data::{FeatureSchema, FeatureTable};
use crate::error::{BloomError, Result};
use crate::evaluation::{forecast, Evaluation, Evaluator, Forecast};
use crate::linear_model::{ModelKind, Params, Regressor};
use crate::model_selection::split_index;
use crate::preprocessing::FittedScaler;
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

const FORMAT_VERSION: u32 = 1;

/// A trained regressor stored together with the scaler it was trained
/// behind and the feature keys it expects.
///
/// Loading an artifact never refits anything: the stored scaler is applied
/// as-is to every table passed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    format_version: u32,
    /// Fitted model.
    pub regressor: Regressor,
    /// Scaler fit on the training slice.
    pub scaler: FittedScaler,
    /// Reference-date column the model was trained with.
    pub date_column: String,
    /// Feature keys in design-matrix order.
    pub feature_keys: Vec<String>,
    /// Hyperparameters the regressor was built with.
    pub params: Params,
    /// Test fraction used at training time.
    pub test_fraction: f64,
}

impl ModelArtifact {
    /// Bundles a fitted model and scaler.
    ///
    /// # Errors
    ///
    /// Returns a not-fitted error if the regressor hasn't been fit, or a
    /// dimension error if the scaler width differs from the feature count.
    pub fn new(
        regressor: Regressor,
        scaler: FittedScaler,
        schema: &FeatureSchema,
        params: Params,
        test_fraction: f64,
    ) -> Result<Self> {
        if !regressor.is_fitted() {
            return Err(BloomError::NotFitted { what: "ModelArtifact regressor" });
        }
        if scaler.n_features() != schema.n_features() {
            return Err(BloomError::dimension_mismatch(
                "scaler features",
                schema.n_features(),
                scaler.n_features(),
            ));
        }
        Ok(Self {
            format_version: FORMAT_VERSION,
            regressor,
            scaler,
            date_column: schema.date_column().to_string(),
            feature_keys: schema.feature_keys().to_vec(),
            params,
            test_fraction,
        })
    }

    /// Model family of the stored regressor.
    #[must_use]
    pub fn kind(&self) -> ModelKind {
        self.regressor.kind()
    }

    /// Schema to read new feature tables with.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the stored keys are invalid.
    pub fn schema(&self) -> Result<FeatureSchema> {
        FeatureSchema::new(self.date_column.clone(), self.feature_keys.clone())
    }

    /// Saves the artifact to a binary file using bincode.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let bytes = bincode::serialize(self)?;
        fs::write(path, bytes)?;
        info!(path = %path.display(), model = %self.kind(), "saved model artifact");
        Ok(())
    }

    /// Loads an artifact from a binary file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file can't be read, or an artifact error
    /// if it doesn't decode or was written by an incompatible version.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        let artifact: Self = bincode::deserialize(&bytes)?;
        if artifact.format_version != FORMAT_VERSION {
            return Err(BloomError::Artifact {
                message: format!(
                    "unsupported artifact version {} (expected {FORMAT_VERSION})",
                    artifact.format_version
                ),
            });
        }
        Ok(artifact)
    }

    /// Raw (unclamped) predictions for an already-built feature matrix.
    ///
    /// # Errors
    ///
    /// Returns a dimension error if `features` has the wrong width.
    pub fn predict_matrix(&self, features: &Matrix) -> Result<Vector> {
        let scaled = self.scaler.transform(features)?;
        self.regressor.predict(&scaled)
    }

    /// Raw (unclamped) predictions for every row of `table`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the table's feature keys differ
    /// from the artifact's.
    pub fn predict_table(&self, table: &FeatureTable) -> Result<Vector> {
        self.check_schema(table.schema())?;
        self.predict_matrix(&table.design_matrix()?)
    }

    /// Clamped bloom-date forecasts for every row of `table`.
    ///
    /// # Errors
    ///
    /// See [`ModelArtifact::predict_table`].
    pub fn forecast(&self, table: &FeatureTable) -> Result<Vec<Forecast>> {
        let predictions = self.predict_table(table)?;
        forecast(&table.reference_dates(), &predictions)
    }

    /// Re-evaluates the model on the trailing test slice of `table`.
    ///
    /// The slice boundary is recomputed with `test_fraction`; the stored
    /// scaler transforms the slice without refitting.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a bad fraction or schema, an
    /// insufficient-data error if either slice would be empty, or a
    /// calendar underflow from the evaluator.
    pub fn evaluate(
        &self,
        table: &FeatureTable,
        calendar: &BloomCalendar,
        test_fraction: f64,
    ) -> Result<Evaluation> {
        self.check_schema(table.schema())?;

        let n_rows = table.len();
        let split = split_index(n_rows, test_fraction)?;
        if split == 0 || split == n_rows {
            return Err(BloomError::insufficient_data(
                "re-evaluation split",
                2,
                n_rows,
            ));
        }

        let test_features = table.design_matrix()?.slice_rows(split..n_rows);
        let predictions = self.predict_matrix(&test_features)?;
        let dates = table.reference_dates();
        Evaluator::new(calendar).evaluate(&dates[split..], &predictions)
    }

    fn check_schema(&self, schema: &FeatureSchema) -> Result<()> {
        if schema.feature_keys() != self.feature_keys.as_slice() {
            return Err(BloomError::configuration(format!(
                "feature keys [{}] do not match the model's [{}]",
                schema.feature_keys().join(", "),
                self.feature_keys.join(", ")
            )));
        }
        Ok(())
    }
}
