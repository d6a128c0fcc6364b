//! Feature scalers.
//!
//! Scalers are fit on the training slice only and then applied, unchanged,
//! to every other slice. [`FittedScaler`] is the immutable result of a fit
//! and is persisted alongside the trained regressor.

use crate::error::{BloomError, Result};
use crate::primitives::Matrix;
use crate::traits::Transformer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Standard deviations at or below this are treated as zero.
const STD_EPSILON: f64 = 1e-10;

/// Standardizes features by removing the mean and scaling to unit variance.
///
/// Uses the population standard deviation. Zero-variance columns are
/// centered but not scaled.
///
/// # Example
///
/// ```
/// use bloomcast::prelude::*;
/// use bloomcast::preprocessing::StandardScaler;
///
/// let data = Matrix::from_vec(3, 2, vec![
///     0.0, 0.0,
///     1.0, 10.0,
///     2.0, 20.0,
/// ]).expect("valid matrix dimensions");
///
/// let mut scaler = StandardScaler::new();
/// let scaled = scaler.fit_transform(&data).expect("non-empty data");
///
/// for j in 0..scaled.n_cols() {
///     let mean = scaled.column(j).mean();
///     assert!(mean.abs() < 1e-12, "Mean should be ~0");
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Mean of each feature (computed during fit).
    mean: Option<Vec<f64>>,
    /// Standard deviation of each feature (computed during fit).
    std: Option<Vec<f64>>,
}

impl StandardScaler {
    /// Creates an unfitted `StandardScaler`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-feature means, `None` before fit.
    #[must_use]
    pub fn mean(&self) -> Option<&[f64]> {
        self.mean.as_deref()
    }

    /// Per-feature standard deviations, `None` before fit.
    #[must_use]
    pub fn std(&self) -> Option<&[f64]> {
        self.std.as_deref()
    }

    /// Returns true if the scaler has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }
}

impl Transformer for StandardScaler {
    fn fit(&mut self, x: &Matrix) -> Result<()> {
        let (n_samples, n_features) = x.shape();
        if n_samples == 0 {
            return Err(BloomError::insufficient_data("StandardScaler::fit", 1, 0));
        }

        let mut mean = vec![0.0; n_features];
        for row in x.rows() {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n_samples as f64;
        }

        let mut std = vec![0.0; n_features];
        for row in x.rows() {
            for ((s, v), m) in std.iter_mut().zip(row).zip(&mean) {
                let diff = v - m;
                *s += diff * diff;
            }
        }
        for s in &mut std {
            *s = (*s / n_samples as f64).sqrt();
        }

        self.mean = Some(mean);
        self.std = Some(std);
        Ok(())
    }

    fn transform(&self, x: &Matrix) -> Result<Matrix> {
        let (mean, std) = match (&self.mean, &self.std) {
            (Some(mean), Some(std)) => (mean, std),
            _ => return Err(BloomError::NotFitted { what: "StandardScaler" }),
        };
        if x.n_cols() != mean.len() {
            return Err(BloomError::dimension_mismatch("n_features", mean.len(), x.n_cols()));
        }

        let mut data = Vec::with_capacity(x.as_slice().len());
        for row in x.rows() {
            for (j, &val) in row.iter().enumerate() {
                let centered = val - mean[j];
                data.push(if std[j] > STD_EPSILON {
                    centered / std[j]
                } else {
                    centered
                });
            }
        }
        Matrix::from_vec(x.n_rows(), x.n_cols(), data)
    }
}

/// Scales features into `[0, 1]`.
///
/// `X_scaled = (X - X_min) / (X_max - X_min)`; constant columns map to 0.
/// Values outside the training range land outside `[0, 1]`.
///
/// # Example
///
/// ```
/// use bloomcast::prelude::*;
/// use bloomcast::preprocessing::MinMaxScaler;
///
/// let data = Matrix::from_vec(3, 2, vec![
///     0.0, 0.0,
///     5.0, 10.0,
///     10.0, 20.0,
/// ]).expect("valid matrix dimensions");
///
/// let mut scaler = MinMaxScaler::new();
/// let scaled = scaler.fit_transform(&data).expect("non-empty data");
///
/// assert!((scaled.get(0, 0) - 0.0).abs() < 1e-12);
/// assert!((scaled.get(1, 0) - 0.5).abs() < 1e-12);
/// assert!((scaled.get(2, 1) - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    data_min: Option<Vec<f64>>,
    data_max: Option<Vec<f64>>,
}

impl MinMaxScaler {
    /// Creates an unfitted `MinMaxScaler`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-feature minimums seen at fit time.
    #[must_use]
    pub fn data_min(&self) -> Option<&[f64]> {
        self.data_min.as_deref()
    }

    /// Per-feature maximums seen at fit time.
    #[must_use]
    pub fn data_max(&self) -> Option<&[f64]> {
        self.data_max.as_deref()
    }

    /// Returns true if the scaler has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.data_min.is_some()
    }
}

impl Transformer for MinMaxScaler {
    fn fit(&mut self, x: &Matrix) -> Result<()> {
        let (n_samples, n_features) = x.shape();
        if n_samples == 0 {
            return Err(BloomError::insufficient_data("MinMaxScaler::fit", 1, 0));
        }

        let mut data_min = vec![f64::INFINITY; n_features];
        let mut data_max = vec![f64::NEG_INFINITY; n_features];
        for row in x.rows() {
            for (j, &val) in row.iter().enumerate() {
                data_min[j] = data_min[j].min(val);
                data_max[j] = data_max[j].max(val);
            }
        }

        self.data_min = Some(data_min);
        self.data_max = Some(data_max);
        Ok(())
    }

    fn transform(&self, x: &Matrix) -> Result<Matrix> {
        let (data_min, data_max) = match (&self.data_min, &self.data_max) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => return Err(BloomError::NotFitted { what: "MinMaxScaler" }),
        };
        if x.n_cols() != data_min.len() {
            return Err(BloomError::dimension_mismatch(
                "n_features",
                data_min.len(),
                x.n_cols(),
            ));
        }

        let mut data = Vec::with_capacity(x.as_slice().len());
        for row in x.rows() {
            for (j, &val) in row.iter().enumerate() {
                let range = data_max[j] - data_min[j];
                data.push(if range.abs() > STD_EPSILON {
                    (val - data_min[j]) / range
                } else {
                    0.0
                });
            }
        }
        Matrix::from_vec(x.n_rows(), x.n_cols(), data)
    }
}

/// Normalization strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalerKind {
    /// Per-feature min-max scaling to `[0, 1]`.
    #[default]
    MinMax,
    /// Per-feature standardization.
    Standard,
}

impl ScalerKind {
    /// Fits a scaler of this kind on `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` has no rows.
    pub fn fit(self, x: &Matrix) -> Result<FittedScaler> {
        match self {
            Self::MinMax => {
                let mut scaler = MinMaxScaler::new();
                scaler.fit(x)?;
                Ok(FittedScaler::MinMax(scaler))
            }
            Self::Standard => {
                let mut scaler = StandardScaler::new();
                scaler.fit(x)?;
                Ok(FittedScaler::Standard(scaler))
            }
        }
    }

    /// Config/CLI name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MinMax => "minmax",
            Self::Standard => "standard",
        }
    }
}

impl fmt::Display for ScalerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScalerKind {
    type Err = BloomError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "minmax" | "min_max" => Ok(Self::MinMax),
            "standard" => Ok(Self::Standard),
            other => Err(BloomError::configuration(format!(
                "unknown scaler '{other}', expected minmax or standard"
            ))),
        }
    }
}

/// Scaler state fit on the training slice; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FittedScaler {
    /// Fitted min-max scaler.
    MinMax(MinMaxScaler),
    /// Fitted standard scaler.
    Standard(StandardScaler),
}

impl FittedScaler {
    /// The strategy this scaler was fit with.
    #[must_use]
    pub fn kind(&self) -> ScalerKind {
        match self {
            Self::MinMax(_) => ScalerKind::MinMax,
            Self::Standard(_) => ScalerKind::Standard,
        }
    }

    /// Applies the fitted transform.
    ///
    /// # Errors
    ///
    /// Returns a dimension error if `x` has a different feature count.
    pub fn transform(&self, x: &Matrix) -> Result<Matrix> {
        match self {
            Self::MinMax(s) => s.transform(x),
            Self::Standard(s) => s.transform(x),
        }
    }

    /// Number of features the scaler was fit on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        match self {
            Self::MinMax(s) => s.data_min().map_or(0, <[f64]>::len),
            Self::Standard(s) => s.mean().map_or(0, <[f64]>::len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn train() -> Matrix {
        Matrix::from_vec(3, 2, vec![1.0, 7.0, 2.0, 7.0, 3.0, 7.0]).expect("3x2")
    }

    #[test]
    fn test_minmax_constant_column_maps_to_zero() {
        let mut scaler = MinMaxScaler::new();
        let out = scaler.fit_transform(&train()).expect("fits");
        assert_eq!(out.column(0).as_slice(), &[0.0, 0.5, 1.0]);
        assert_eq!(out.column(1).as_slice(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_minmax_extrapolates_outside_training_range() {
        let mut scaler = MinMaxScaler::new();
        scaler.fit(&train()).expect("fits");
        let test = Matrix::from_vec(1, 2, vec![5.0, 7.0]).expect("1x2");
        let out = scaler.transform(&test).expect("same width");
        assert!((out.get(0, 0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_standard_population_std() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&train()).expect("fits");
        let std = scaler.std().expect("fitted");
        assert!((std[0] - (2.0_f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(std[1], 0.0);

        let out = scaler.transform(&train()).expect("same width");
        // Zero-variance column is centered only
        assert_eq!(out.column(1).as_slice(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unfitted_transform_errors() {
        assert!(matches!(
            MinMaxScaler::new().transform(&train()),
            Err(BloomError::NotFitted { .. })
        ));
        assert!(matches!(
            StandardScaler::new().transform(&train()),
            Err(BloomError::NotFitted { .. })
        ));
    }

    #[test]
    fn test_width_mismatch() {
        let fitted = ScalerKind::Standard.fit(&train()).expect("fits");
        let narrow = Matrix::from_vec(1, 1, vec![0.0]).expect("1x1");
        assert!(matches!(
            fitted.transform(&narrow),
            Err(BloomError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_fit_rejected() {
        let empty = Matrix::zeros(0, 2);
        assert!(ScalerKind::MinMax.fit(&empty).is_err());
    }

    #[test]
    fn test_scaler_kind_parse() {
        assert_eq!("minmax".parse::<ScalerKind>().expect("known"), ScalerKind::MinMax);
        assert_eq!("Standard".parse::<ScalerKind>().expect("known"), ScalerKind::Standard);
        assert!("robust".parse::<ScalerKind>().is_err());
        assert_eq!(ScalerKind::Standard.to_string(), "standard");
    }

    #[test]
    fn test_fitted_scaler_metadata() {
        let fitted = ScalerKind::MinMax.fit(&train()).expect("fits");
        assert_eq!(fitted.kind(), ScalerKind::MinMax);
        assert_eq!(fitted.n_features(), 2);
    }
}
