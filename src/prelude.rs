//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use bloomcast::prelude::*;
//! ```

pub use crate::calendar::BloomCalendar;
pub use crate::data::{FeatureSchema, FeatureTable};
pub use crate::evaluation::{Evaluator, PredictionRecord};
pub use crate::labeling::TargetLabeler;
pub use crate::linear_model::{
    BayesianRidge, ElasticNet, HuberRegressor, Lasso, LinearRegression, ModelKind,
    RansacRegressor, Ridge,
};
pub use crate::metrics::{mae, mse, r_squared, rmse};
pub use crate::model_selection::split_and_scale;
pub use crate::preprocessing::ScalerKind;
pub use crate::primitives::{Matrix, Vector};
pub use crate::traits::{Estimator, Transformer};
pub use crate::training::ModelArtifact;
