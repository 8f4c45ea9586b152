//! Imputation of missing count columns.
//!
//! This module provides:
//! - A Yeo-Johnson power transform and least-squares line ([`PowerTransform`], [`LinearFit`])
//! - Per-target regression imputation from a numeric predictor ([`RegressionImputer`])

mod power;
mod regression;

pub use power::{LinearFit, PowerTransform, yeo_johnson};
pub use regression::{
    FittedRegressionImputer, MIN_TRAINING_ROWS, ModelDiagnostics, RegressionImputer, TargetModel,
};
