//! Evaluation of raw model predictions against the bloom calendar.
//!
//! Raw predictions are clamped to `[0, MAX_TARGET_DAYS]` before any use,
//! converted to predicted bloom dates, and compared with the true next
//! bloom recomputed from the same [`BloomCalendar`] the labels came from.

use crate::calendar::BloomCalendar;
use crate::error::{BloomError, Result};
use crate::labeling::MAX_TARGET_DAYS;
use crate::primitives::Vector;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Clamps a raw prediction into `[0, MAX_TARGET_DAYS]`.
///
/// # Example
///
/// ```
/// use bloomcast::evaluation::clamp_days;
///
/// assert_eq!(clamp_days(400.0), 365.0);
/// assert_eq!(clamp_days(-5.0), 0.0);
/// assert_eq!(clamp_days(42.5), 42.5);
/// ```
#[must_use]
pub fn clamp_days(raw: f64) -> f64 {
    raw.clamp(0.0, f64::from(MAX_TARGET_DAYS))
}

/// `reference + days`, with `days` rounded to the nearest whole day.
///
/// # Errors
///
/// Returns a configuration error if `days` is not finite or the result
/// leaves chrono's date range.
pub fn predicted_bloom_date(reference: NaiveDate, days: f64) -> Result<NaiveDate> {
    if !days.is_finite() {
        return Err(BloomError::configuration(format!(
            "prediction for {reference} is not a finite number of days"
        )));
    }
    // Clamped predictions are within [0, 365], so the cast cannot truncate
    let whole = days.round() as i64;
    reference
        .checked_add_signed(Duration::days(whole))
        .ok_or_else(|| {
            BloomError::configuration(format!("{reference} + {whole} days is out of range"))
        })
}

/// Comparison of one prediction with the calendar's ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Sampling day of the observation.
    #[serde(rename = "date")]
    pub reference_date: NaiveDate,
    /// Clamped predicted days until bloom.
    pub pred_days: f64,
    /// Days from the reference date to the true next bloom.
    pub true_days_until_bloom: i64,
    /// `|true_days_until_bloom - pred_days|`.
    pub abs_error: f64,
    /// Reference date plus the rounded predicted days.
    pub pred_bloom_date: NaiveDate,
    /// Next bloom strictly after the reference date.
    pub true_bloom_date: NaiveDate,
}

/// Bloom-date forecast for an observation without ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// Sampling day of the observation.
    #[serde(rename = "date")]
    pub reference_date: NaiveDate,
    /// Clamped predicted days until bloom.
    pub pred_days: f64,
    /// Reference date plus the rounded predicted days.
    pub pred_bloom_date: NaiveDate,
}

/// Aggregate absolute error over all records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    /// Number of records.
    pub count: usize,
    /// Mean absolute error in days.
    pub mean_abs_error: f64,
    /// Largest absolute error.
    pub max_abs_error: f64,
    /// Smallest absolute error.
    pub min_abs_error: f64,
}

impl ErrorSummary {
    /// Summarizes a non-empty record set.
    ///
    /// # Errors
    ///
    /// Returns an insufficient-data error for an empty slice.
    pub fn from_records(records: &[PredictionRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(BloomError::insufficient_data("error summary", 1, 0));
        }
        let errors = records.iter().map(|r| r.abs_error);
        Ok(Self {
            count: records.len(),
            mean_abs_error: errors.clone().sum::<f64>() / records.len() as f64,
            max_abs_error: errors.clone().fold(f64::NEG_INFINITY, f64::max),
            min_abs_error: errors.fold(f64::INFINITY, f64::min),
        })
    }
}

/// Records in input order plus their summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// One record per evaluated observation.
    pub records: Vec<PredictionRecord>,
    /// Aggregate absolute error.
    pub summary: ErrorSummary,
}

/// Scores predictions against a bloom calendar.
///
/// # Example
///
/// ```
/// use bloomcast::calendar::BloomCalendar;
/// use bloomcast::evaluation::Evaluator;
/// use bloomcast::primitives::Vector;
/// use chrono::NaiveDate;
///
/// let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).expect("valid date");
/// let calendar = BloomCalendar::new([date(2025, 4, 10)]).expect("non-empty");
///
/// let evaluation = Evaluator::new(&calendar)
///     .evaluate(&[date(2025, 4, 1)], &Vector::from_slice(&[400.0]))
///     .expect("lengths match");
///
/// let record = &evaluation.records[0];
/// assert_eq!(record.pred_days, 365.0);
/// assert_eq!(record.true_days_until_bloom, 9);
/// assert_eq!(record.abs_error, 356.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    calendar: &'a BloomCalendar,
}

impl<'a> Evaluator<'a> {
    /// Creates an evaluator reading ground truth from `calendar`.
    #[must_use]
    pub fn new(calendar: &'a BloomCalendar) -> Self {
        Self { calendar }
    }

    /// Builds one record per `(reference_date, raw prediction)` pair.
    ///
    /// # Errors
    ///
    /// Returns a dimension error if the inputs differ in length, an
    /// insufficient-data error if they are empty, or a calendar underflow
    /// if a reference date has no later bloom.
    pub fn evaluate(&self, reference_dates: &[NaiveDate], predictions: &Vector) -> Result<Evaluation> {
        if reference_dates.len() != predictions.len() {
            return Err(BloomError::dimension_mismatch(
                "predictions",
                reference_dates.len(),
                predictions.len(),
            ));
        }

        let records = reference_dates
            .iter()
            .zip(predictions.iter())
            .map(|(&reference_date, &raw)| self.record(reference_date, raw))
            .collect::<Result<Vec<_>>>()?;
        let summary = ErrorSummary::from_records(&records)?;

        info!(
            records = summary.count,
            mae = summary.mean_abs_error,
            max = summary.max_abs_error,
            min = summary.min_abs_error,
            "evaluated predictions"
        );
        Ok(Evaluation { records, summary })
    }

    fn record(&self, reference_date: NaiveDate, raw: f64) -> Result<PredictionRecord> {
        let pred_days = clamp_days(raw);
        let pred_bloom_date = predicted_bloom_date(reference_date, pred_days)?;
        let true_bloom_date = self.calendar.next_bloom_after(reference_date)?;
        let true_days_until_bloom = (true_bloom_date - reference_date).num_days();

        Ok(PredictionRecord {
            reference_date,
            pred_days,
            true_days_until_bloom,
            abs_error: (true_days_until_bloom as f64 - pred_days).abs(),
            pred_bloom_date,
            true_bloom_date,
        })
    }
}

/// Clamps raw predictions and attaches predicted bloom dates.
///
/// # Errors
///
/// Returns a dimension error if the inputs differ in length.
pub fn forecast(reference_dates: &[NaiveDate], predictions: &Vector) -> Result<Vec<Forecast>> {
    if reference_dates.len() != predictions.len() {
        return Err(BloomError::dimension_mismatch(
            "predictions",
            reference_dates.len(),
            predictions.len(),
        ));
    }
    reference_dates
        .iter()
        .zip(predictions.iter())
        .map(|(&reference_date, &raw)| {
            let pred_days = clamp_days(raw);
            Ok(Forecast {
                reference_date,
                pred_days,
                pred_bloom_date: predicted_bloom_date(reference_date, pred_days)?,
            })
        })
        .collect()
}

/// Serialization format for record sequences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON array.
    #[default]
    Json,
    /// One JSON object per line.
    #[serde(rename = "jsonl")]
    JsonLines,
    /// CSV with a header row.
    Csv,
}

impl OutputFormat {
    /// CLI name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::JsonLines => "jsonl",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = BloomError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Ok(Self::JsonLines),
            "csv" => Ok(Self::Csv),
            other => Err(BloomError::configuration(format!(
                "unknown output format '{other}', expected json, jsonl or csv"
            ))),
        }
    }
}

/// Writes records in the given format.
///
/// # Errors
///
/// Returns an I/O, JSON or CSV error if writing fails.
pub fn write_records<W, T>(mut writer: W, records: &[T], format: OutputFormat) -> Result<()>
where
    W: Write,
    T: Serialize,
{
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, records)?;
            writeln!(writer)?;
        }
        OutputFormat::JsonLines => {
            for record in records {
                serde_json::to_writer(&mut writer, record)?;
                writeln!(writer)?;
            }
        }
        OutputFormat::Csv => {
            let mut csv_writer = csv::Writer::from_writer(&mut writer);
            for record in records {
                csv_writer.serialize(record)?;
            }
            csv_writer.flush()?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Writes records to a file, or to stdout when `path` is `None`.
///
/// # Errors
///
/// See [`write_records`]; also fails if the file cannot be created.
pub fn write_records_to<T: Serialize>(
    path: Option<&Path>,
    records: &[T],
    format: OutputFormat,
) -> Result<()> {
    match path {
        Some(path) => {
            let file = BufWriter::new(File::create(path)?);
            write_records(file, records, format)?;
            info!(path = %path.display(), records = records.len(), %format, "wrote records");
            Ok(())
        }
        None => write_records(io::stdout().lock(), records, format),
    }
}
