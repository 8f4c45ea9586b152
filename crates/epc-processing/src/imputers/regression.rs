//! Regression imputation of count columns from a single numeric predictor.
//!
//! Each target gets its own model: the predictor goes through a fitted
//! Yeo-Johnson transform, the target through `ln(1 + y)`, and a straight line
//! links the two. Predictions are mapped back with `e^y - 1`, rounded half to
//! even and floored at zero so imputed values are valid counts.

use super::power::{LinearFit, PowerTransform, r_squared};
use crate::config::RegressionImputerConfig;
use crate::error::{PreprocessingError, Result};
use crate::transform::{Estimator, FittedTransform};
use crate::utils::{check_required_columns, ensure_non_empty, numeric_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Minimum rows with both predictor and target present to fit a model.
pub const MIN_TRAINING_ROWS: usize = 2;

/// Goodness-of-fit figures recorded on the training rows of one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelDiagnostics {
    /// Rows used to fit the model.
    pub n_samples: usize,
    /// R² on the `ln(1 + y)` scale.
    pub r_squared: f64,
    /// Mean absolute error of the rounded predictions, in counts.
    pub mean_absolute_error: f64,
}

/// Fitted model for one target column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetModel {
    target: String,
    power: PowerTransform,
    line: LinearFit,
    diagnostics: ModelDiagnostics,
}

impl TargetModel {
    fn fit(target: &str, xs: &[f64], ys: &[f64]) -> Self {
        let power = PowerTransform::fit(xs);
        let zs: Vec<f64> = xs.iter().map(|&x| power.transform(x)).collect();
        let log_ys: Vec<f64> = ys.iter().map(|y| y.ln_1p()).collect();
        let line = LinearFit::fit(&zs, &log_ys);

        let fitted_log: Vec<f64> = zs.iter().map(|&z| line.predict(z)).collect();
        let mut model = Self {
            target: target.to_string(),
            power,
            line,
            diagnostics: ModelDiagnostics {
                n_samples: xs.len(),
                r_squared: r_squared(&log_ys, &fitted_log),
                mean_absolute_error: 0.0,
            },
        };

        let errors: Vec<f64> = xs
            .iter()
            .zip(ys)
            .filter_map(|(&x, &y)| model.predict(x).map(|p| (p - y).abs()))
            .collect();
        if !errors.is_empty() {
            model.diagnostics.mean_absolute_error =
                errors.iter().sum::<f64>() / errors.len() as f64;
        }
        model
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn power_transform(&self) -> &PowerTransform {
        &self.power
    }

    pub fn diagnostics(&self) -> &ModelDiagnostics {
        &self.diagnostics
    }

    /// Predicted count for one predictor value; never negative.
    ///
    /// `None` when the back-transformed count overflows to a non-finite value.
    pub fn predict(&self, predictor: f64) -> Option<f64> {
        let z = self.power.transform(predictor);
        let count = self.line.predict(z).exp_m1().round_ties_even();
        if !count.is_finite() {
            return None;
        }
        Some(if count > 0.0 { count } else { 0.0 })
    }
}

/// Unfitted regression imputer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegressionImputer {
    config: RegressionImputerConfig,
}

impl RegressionImputer {
    pub fn new(config: RegressionImputerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RegressionImputerConfig {
        &self.config
    }
}

impl Estimator for RegressionImputer {
    type Fitted = FittedRegressionImputer;

    fn fit(&self, df: &DataFrame) -> Result<FittedRegressionImputer> {
        check_required_columns(df, &self.config.input_columns())?;
        ensure_non_empty(df, FittedRegressionImputer::NAME)?;

        let predictor = numeric_values(
            df.column(&self.config.predictor)?
                .as_materialized_series(),
        )?;

        let mut models = Vec::with_capacity(self.config.targets.len());
        for target in &self.config.targets {
            let values = numeric_values(df.column(target)?.as_materialized_series())?;

            let (xs, ys): (Vec<f64>, Vec<f64>) = predictor
                .iter()
                .zip(&values)
                .filter_map(|(x, y)| match (x, y) {
                    (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((*x, *y)),
                    _ => None,
                })
                .unzip();

            if xs.len() < MIN_TRAINING_ROWS {
                return Err(PreprocessingError::ImputationFailed {
                    column: target.clone(),
                    reason: format!(
                        "{} row(s) with both '{}' and '{}' present; at least {} required",
                        xs.len(),
                        self.config.predictor,
                        target,
                        MIN_TRAINING_ROWS
                    ),
                });
            }
            if let Some(bad) = ys.iter().find(|&&y| y < 0.0) {
                return Err(PreprocessingError::InvalidInput(format!(
                    "column '{}' contains negative count {}",
                    target, bad
                )));
            }

            let model = TargetModel::fit(target, &xs, &ys);
            info!(
                "Fitted imputation model for '{}' on {} rows (lambda={:.4}, R²={:.3}, MAE={:.3})",
                target,
                model.diagnostics.n_samples,
                model.power.lambda(),
                model.diagnostics.r_squared,
                model.diagnostics.mean_absolute_error
            );
            models.push(model);
        }

        Ok(FittedRegressionImputer {
            predictor: self.config.predictor.clone(),
            models,
            n_samples: df.height(),
        })
    }
}

/// Regression imputer with one fitted model per target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedRegressionImputer {
    predictor: String,
    models: Vec<TargetModel>,
    n_samples: usize,
}

impl FittedRegressionImputer {
    pub fn predictor(&self) -> &str {
        &self.predictor
    }

    /// Target columns, in output order.
    pub fn targets(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.target.as_str()).collect()
    }

    pub fn models(&self) -> &[TargetModel] {
        &self.models
    }

    pub fn model(&self, target: &str) -> Option<&TargetModel> {
        self.models.iter().find(|m| m.target == target)
    }

    fn input_columns(&self) -> Vec<String> {
        let mut columns = vec![self.predictor.clone()];
        columns.extend(self.models.iter().map(|m| m.target.clone()));
        columns
    }
}

impl FittedTransform for FittedRegressionImputer {
    const NAME: &'static str = "RegressionImputer";

    fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Returns only the target columns, as Float64.
    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        self.check_is_fitted()?;
        check_required_columns(df, &self.input_columns())?;

        let predictor = numeric_values(df.column(&self.predictor)?.as_materialized_series())?;
        let mut columns = Vec::with_capacity(self.models.len());

        for model in &self.models {
            let values = numeric_values(df.column(&model.target)?.as_materialized_series())?;
            let mut imputed = 0usize;
            let mut unresolved = 0usize;
            let mut overflowed = 0usize;

            let filled: Vec<Option<f64>> = values
                .iter()
                .zip(&predictor)
                .map(|(y, x)| match (y, x) {
                    (Some(y), _) => Some(*y),
                    (None, Some(x)) if x.is_finite() => match model.predict(*x) {
                        Some(count) => {
                            imputed += 1;
                            Some(count)
                        }
                        None => {
                            overflowed += 1;
                            None
                        }
                    },
                    (None, _) => {
                        unresolved += 1;
                        None
                    }
                })
                .collect();

            debug!("Imputed {} values in '{}'", imputed, model.target);
            if unresolved > 0 {
                warn!(
                    "{} row(s) of '{}' left missing: '{}' is missing too",
                    unresolved, model.target, self.predictor
                );
            }

            if overflowed > 0 {
                warn!(
                    "{} row(s) of '{}' left missing: prediction is not finite for '{}' that far out",
                    overflowed, model.target, self.predictor
                );
            }

            columns.push(Series::new(model.target.as_str().into(), filled).into_column());
        }

        Ok(DataFrame::new(columns)?)
    }
}

static_assertions::assert_impl_all!(FittedRegressionImputer: Send, Sync);
