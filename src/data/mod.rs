//! Observation tables and bloom-date lists.
//!
//! Feature tables are read from CSV with a configuration-driven schema: the
//! date column plus a named list of feature keys are extracted from every
//! row and all other columns are ignored. Rows that fail to parse are
//! rejected with their line number; no default values are substituted.

use crate::calendar::BloomCalendar;
use crate::error::{BloomError, Result};
use crate::primitives::Matrix;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;
use tracing::{info, warn};

/// Default name of the reference-date column.
pub const DEFAULT_DATE_COLUMN: &str = "date";

/// Default name of the bloom-date column.
pub const DEFAULT_BLOOM_COLUMN: &str = "bloom_date";

/// Default name of the appended label column.
pub const TARGET_COLUMN: &str = "target";

/// One environmental sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Sampling day.
    pub reference_date: NaiveDate,
    /// Feature values keyed by column name.
    pub features: BTreeMap<String, f64>,
}

impl Observation {
    /// Creates an observation from `(key, value)` pairs.
    pub fn new<K, I>(reference_date: NaiveDate, features: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        Self {
            reference_date,
            features: features.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Value of one feature, if present.
    #[must_use]
    pub fn feature(&self, key: &str) -> Option<f64> {
        self.features.get(key).copied()
    }
}

/// Which columns to read from a feature table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    date_column: String,
    feature_keys: Vec<String>,
}

impl FeatureSchema {
    /// Creates a schema with an explicit date column.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `feature_keys` is empty, contains
    /// duplicates, or includes the date column.
    pub fn new(date_column: impl Into<String>, feature_keys: Vec<String>) -> Result<Self> {
        let date_column = date_column.into();
        if feature_keys.is_empty() {
            return Err(BloomError::configuration("feature key list is empty"));
        }
        let mut seen = HashSet::new();
        for key in &feature_keys {
            if key.is_empty() {
                return Err(BloomError::configuration("feature keys cannot be empty strings"));
            }
            if key == &date_column {
                return Err(BloomError::configuration(format!(
                    "feature key '{key}' collides with the date column"
                )));
            }
            if !seen.insert(key.as_str()) {
                return Err(BloomError::configuration(format!(
                    "duplicate feature key '{key}'"
                )));
            }
        }
        Ok(Self {
            date_column,
            feature_keys,
        })
    }

    /// Creates a schema using the default `date` column.
    ///
    /// # Errors
    ///
    /// See [`FeatureSchema::new`].
    pub fn with_features<S: Into<String>>(feature_keys: impl IntoIterator<Item = S>) -> Result<Self> {
        Self::new(
            DEFAULT_DATE_COLUMN,
            feature_keys.into_iter().map(Into::into).collect(),
        )
    }

    /// Name of the reference-date column.
    #[must_use]
    pub fn date_column(&self) -> &str {
        &self.date_column
    }

    /// Ordered feature keys; this order defines design-matrix columns.
    #[must_use]
    pub fn feature_keys(&self) -> &[String] {
        &self.feature_keys
    }

    /// Number of features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_keys.len()
    }
}

/// Ordered sequence of observations sharing one schema.
///
/// # Example
///
/// ```
/// use bloomcast::data::{FeatureSchema, FeatureTable};
///
/// let csv = "date,EVI,tmax,site\n2024-01-01,0.31,4.5,A\n2024-01-09,0.33,6.0,A\n";
/// let schema = FeatureSchema::with_features(["EVI", "tmax"]).expect("valid schema");
/// let table = FeatureTable::from_reader(csv.as_bytes(), schema).expect("well-formed");
///
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.design_matrix().expect("complete rows").shape(), (2, 2));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    schema: FeatureSchema,
    observations: Vec<Observation>,
}

impl FeatureTable {
    /// Builds a table from in-memory observations.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an observation lacks a schema feature.
    pub fn new(schema: FeatureSchema, observations: Vec<Observation>) -> Result<Self> {
        for (idx, obs) in observations.iter().enumerate() {
            if let Some(missing) = schema
                .feature_keys()
                .iter()
                .find(|key| !obs.features.contains_key(key.as_str()))
            {
                return Err(BloomError::configuration(format!(
                    "observation {idx} ({}) is missing feature '{missing}'",
                    obs.reference_date
                )));
            }
        }
        warn_if_unordered(&observations);
        Ok(Self {
            schema,
            observations,
        })
    }

    /// Reads a CSV feature table from disk.
    ///
    /// # Errors
    ///
    /// Returns an I/O or CSV error if the file can't be read, a configuration
    /// error for missing columns, or a malformed-row error for bad cells.
    pub fn from_csv_path<P: AsRef<Path>>(path: P, schema: FeatureSchema) -> Result<Self> {
        let path = path.as_ref();
        let reader = csv::Reader::from_path(path)?;
        let table = Self::from_csv_reader(reader, schema)?;
        info!(path = %path.display(), rows = table.len(), "loaded feature table");
        Ok(table)
    }

    /// Reads a CSV feature table from any reader.
    ///
    /// # Errors
    ///
    /// See [`FeatureTable::from_csv_path`].
    pub fn from_reader<R: io::Read>(reader: R, schema: FeatureSchema) -> Result<Self> {
        Self::from_csv_reader(csv::Reader::from_reader(reader), schema)
    }

    fn from_csv_reader<R: io::Read>(mut reader: csv::Reader<R>, schema: FeatureSchema) -> Result<Self> {
        let headers = reader.headers()?.clone();
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);

        let mut missing = Vec::new();
        let date_idx = position(schema.date_column());
        if date_idx.is_none() {
            missing.push(schema.date_column().to_string());
        }
        let mut feature_idx = Vec::with_capacity(schema.n_features());
        for key in schema.feature_keys() {
            match position(key) {
                Some(idx) => feature_idx.push(idx),
                None => missing.push(key.clone()),
            }
        }
        let date_idx = match date_idx {
            Some(idx) if missing.is_empty() => idx,
            _ => {
                return Err(BloomError::configuration(format!(
                    "feature table is missing required columns: {}",
                    missing.join(", ")
                )))
            }
        };

        let mut observations = Vec::new();
        for (offset, record) in reader.records().enumerate() {
            // Header occupies line 1
            let line = offset + 2;
            let record = record?;

            let raw_date = record.get(date_idx).unwrap_or_default();
            let reference_date =
                parse_date(raw_date).ok_or_else(|| BloomError::MalformedRow {
                    row: line,
                    column: schema.date_column().to_string(),
                    reason: format!("unparsable date '{raw_date}'"),
                })?;

            let mut features = BTreeMap::new();
            for (key, &idx) in schema.feature_keys().iter().zip(&feature_idx) {
                let raw = record.get(idx).unwrap_or_default();
                let value = parse_feature(raw).ok_or_else(|| BloomError::MalformedRow {
                    row: line,
                    column: key.clone(),
                    reason: format!("non-numeric value '{raw}'"),
                })?;
                features.insert(key.clone(), value);
            }

            observations.push(Observation {
                reference_date,
                features,
            });
        }

        warn_if_unordered(&observations);
        Ok(Self {
            schema,
            observations,
        })
    }

    /// The schema rows were read with.
    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Observations in storage order.
    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// True if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Reference dates in storage order.
    #[must_use]
    pub fn reference_dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.reference_date).collect()
    }

    /// Feature matrix with one row per observation and one column per key.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an observation lacks a feature.
    pub fn design_matrix(&self) -> Result<Matrix> {
        let keys = self.schema.feature_keys();
        let mut data = Vec::with_capacity(self.len() * keys.len());
        for obs in &self.observations {
            for key in keys {
                let value = obs.feature(key).ok_or_else(|| {
                    BloomError::configuration(format!(
                        "observation on {} is missing feature '{key}'",
                        obs.reference_date
                    ))
                })?;
                data.push(value);
            }
        }
        Matrix::from_vec(self.len(), keys.len(), data)
    }

    /// Writes date, schema features and a `target` column as CSV.
    ///
    /// # Errors
    ///
    /// Returns a dimension error if `targets` has the wrong length, or a CSV
    /// error if writing fails.
    pub fn write_labeled_csv<W: io::Write>(&self, writer: W, targets: &[u32]) -> Result<()> {
        if targets.len() != self.len() {
            return Err(BloomError::dimension_mismatch("targets", self.len(), targets.len()));
        }

        let mut out = csv::Writer::from_writer(writer);
        let mut header = Vec::with_capacity(self.schema.n_features() + 2);
        header.push(self.schema.date_column().to_string());
        header.extend(self.schema.feature_keys().iter().cloned());
        header.push(TARGET_COLUMN.to_string());
        out.write_record(&header)?;

        for (obs, target) in self.observations.iter().zip(targets) {
            let mut row = Vec::with_capacity(header.len());
            row.push(obs.reference_date.to_string());
            for key in self.schema.feature_keys() {
                row.push(obs.feature(key).map(|v| v.to_string()).unwrap_or_default());
            }
            row.push(target.to_string());
            out.write_record(&row)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Parses `YYYY-MM-DD`, or `YYYY-MM-DD HH:MM:SS` with the time discarded.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

fn parse_feature(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn warn_if_unordered(observations: &[Observation]) {
    let decreases = observations
        .windows(2)
        .filter(|pair| pair[1].reference_date < pair[0].reference_date)
        .count();
    if decreases > 0 {
        warn!(
            decreases,
            "reference dates are not monotonically non-decreasing, temporal split trusts storage order"
        );
    }
}

/// Reads bloom dates from a CSV column.
///
/// # Errors
///
/// Returns a configuration error if the column is missing, or a
/// malformed-row error for unparsable dates.
pub fn read_bloom_dates<R: io::Read>(reader: R, column: &str) -> Result<Vec<NaiveDate>> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers()?.clone();
    let idx = headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| {
            BloomError::configuration(format!(
                "bloom date list is missing column '{column}' (available: {})",
                headers.iter().collect::<Vec<_>>().join(", ")
            ))
        })?;

    let mut dates = Vec::new();
    for (offset, record) in reader.records().enumerate() {
        let record = record?;
        let raw = record.get(idx).unwrap_or_default();
        let date = parse_date(raw).ok_or_else(|| BloomError::MalformedRow {
            row: offset + 2,
            column: column.to_string(),
            reason: format!("unparsable date '{raw}'"),
        })?;
        dates.push(date);
    }
    Ok(dates)
}

/// Reads a bloom calendar from a CSV file.
///
/// # Errors
///
/// See [`read_bloom_dates`]; additionally fails with calendar underflow if
/// the file holds no dates.
pub fn load_bloom_calendar<P: AsRef<Path>>(path: P, column: &str) -> Result<BloomCalendar> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let dates = read_bloom_dates(file, column)?;
    let calendar = BloomCalendar::new(dates)?;
    info!(
        path = %path.display(),
        events = calendar.len(),
        earliest = %calendar.earliest(),
        latest = %calendar.latest(),
        "loaded bloom calendar"
    );
    Ok(calendar)
}
