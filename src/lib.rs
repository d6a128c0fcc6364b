//! Bloomcast: days-until-next-bloom forecasting from climate and
//! vegetation time series.
//!
//! Each environmental observation is labeled with the number of days until
//! the next recorded bloom (capped at 365), split chronologically into a
//! train and test slice, scaled with train-only statistics, and used to fit
//! linear regressors. Predictions are clamped back into the label range and
//! compared with the true next bloom from the same calendar.
//!
//! # Quick Start
//!
//! ```
//! use bloomcast::calendar::BloomCalendar;
//! use bloomcast::labeling::label;
//! use chrono::NaiveDate;
//!
//! let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).expect("valid date");
//! let calendar = BloomCalendar::new([date(2025, 4, 10), date(2025, 9, 5)]).expect("non-empty");
//!
//! let targets = label(&[date(2025, 3, 1), date(2025, 9, 10)], &calendar).expect("covered");
//! assert_eq!(targets, vec![40, 212]);
//! ```
//!
//! # Modules
//!
//! - [`calendar`]: Bloom event set and next-bloom lookup
//! - [`labeling`]: Capped days-until-bloom targets
//! - [`data`]: Feature tables and bloom date lists (CSV)
//! - [`model_selection`]: Temporal split/scale, K-fold CV, grid search
//! - [`preprocessing`]: Min-max and standard scalers
//! - [`linear_model`]: OLS, Ridge, Lasso, Elastic Net, Bayesian ridge, Huber, RANSAC
//! - [`metrics`]: MAE, MSE, RMSE, R²
//! - [`evaluation`]: Prediction records and error summaries
//! - [`training`]: Model comparison and persisted artifacts
//! - [`config`]: JSON pipeline configuration

pub mod calendar;
pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod labeling;
pub mod linear_model;
pub mod metrics;
pub mod model_selection;
pub mod prelude;
pub mod preprocessing;
pub mod primitives;
pub mod traits;
pub mod training;

pub use error::{BloomError, Result};
pub use primitives::{Matrix, Vector};
pub use traits::{Estimator, Transformer};
