//! Full preprocessing chain.
//!
//! [`Preprocessor`] fits the feature pipeline, a rare-category reducer over
//! the surviving categorical columns and a regression imputer for the room
//! counts. The resulting [`FittedPreprocessor`] can be saved as JSON and
//! reloaded to transform new data with exactly the fitted state.

use crate::config::PreprocessorConfig;
use crate::error::{PreprocessingError, Result, ResultExt};
use crate::imputers::{FittedRegressionImputer, RegressionImputer};
use crate::pipeline::feature::{FeaturePipeline, FittedFeaturePipeline};
use crate::reducers::{FittedRareCategoryReducer, RareCategoryReducer};
use crate::transform::{Estimator, FittedTransform};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// The preprocessing chain, configured but not fitted.
///
/// Use [`Preprocessor::builder()`] to create one with a custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use epc_processing::{Preprocessor, PreprocessorConfig, RareThreshold};
///
/// let config = PreprocessorConfig::builder()
///     .rare_threshold(RareThreshold::Count(20))
///     .include_text(false)
///     .build()?;
///
/// let fitted = Preprocessor::builder().config(config).build()?.fit(&train)?;
/// fitted.save("state.json")?;
///
/// let features = fitted.transform(&new_data)?;
/// ```
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: PreprocessorConfig,
    feature: FeaturePipeline,
    rare: Option<RareCategoryReducer>,
    imputer: RegressionImputer,
}

impl Preprocessor {
    /// Create a new preprocessor builder.
    pub fn builder() -> PreprocessorBuilder {
        PreprocessorBuilder::default()
    }

    pub fn new(config: PreprocessorConfig) -> Result<Self> {
        config.validate()?;
        let rare = if config.rare.enabled {
            Some(RareCategoryReducer::from_config(&config.rare)?)
        } else {
            None
        };
        Ok(Self {
            feature: FeaturePipeline::new(config.feature.clone())?,
            rare,
            imputer: RegressionImputer::new(config.imputer.clone())?,
            config,
        })
    }

    pub fn config(&self) -> &PreprocessorConfig {
        &self.config
    }
}

impl Estimator for Preprocessor {
    type Fitted = FittedPreprocessor;

    fn fit(&self, df: &DataFrame) -> Result<FittedPreprocessor> {
        info!(
            "Fitting preprocessor on {} rows x {} columns",
            df.height(),
            df.width()
        );

        let feature = self.feature.fit(df).context("feature pipeline")?;
        let features = feature.transform(df).context("feature pipeline")?;
        let retained = feature.retained_columns();

        let rare = match &self.rare {
            Some(reducer) => {
                let categorical: Vec<&str> = retained
                    .iter()
                    .filter(|c| self.config.feature.columns.categorical.contains(*c))
                    .map(String::as_str)
                    .collect();
                if categorical.is_empty() {
                    info!("Skipping rare-category reduction: no categorical columns retained");
                    None
                } else {
                    let subset = features.select(categorical)?;
                    Some(reducer.fit(&subset).context("rare-category reducer")?)
                }
            }
            None => {
                debug!("Rare-category reduction disabled");
                None
            }
        };

        let imputer_columns = self.config.imputer.input_columns();
        let absent: Vec<&String> = imputer_columns
            .iter()
            .filter(|c| !retained.contains(*c))
            .collect();
        let imputer = if absent.is_empty() {
            Some(self.imputer.fit(&features).context("regression imputer")?)
        } else {
            info!("Skipping regression imputation: {:?} not retained", absent);
            None
        };

        let fitted = FittedPreprocessor {
            metadata: StateMetadata {
                crate_version: env!("CARGO_PKG_VERSION").to_string(),
                fitted_at: Utc::now(),
                n_samples: df.height(),
            },
            config: self.config.clone(),
            feature,
            rare,
            imputer,
        };
        info!(
            "Preprocessor fitted: {} output columns",
            fitted.output_columns().len()
        );
        Ok(fitted)
    }
}

/// Provenance of a fitted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMetadata {
    /// Version of this crate that produced the state.
    pub crate_version: String,
    pub fitted_at: DateTime<Utc>,
    /// Rows of the training table.
    pub n_samples: usize,
}

/// A fitted preprocessing chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    metadata: StateMetadata,
    config: PreprocessorConfig,
    feature: FittedFeaturePipeline,
    rare: Option<FittedRareCategoryReducer>,
    imputer: Option<FittedRegressionImputer>,
}

// Fitted state is shared read-only across threads
static_assertions::assert_impl_all!(FittedPreprocessor: Send, Sync);

impl FittedPreprocessor {
    pub fn metadata(&self) -> &StateMetadata {
        &self.metadata
    }

    pub fn config(&self) -> &PreprocessorConfig {
        &self.config
    }

    pub fn feature_pipeline(&self) -> &FittedFeaturePipeline {
        &self.feature
    }

    pub fn rare_reducer(&self) -> Option<&FittedRareCategoryReducer> {
        self.rare.as_ref()
    }

    pub fn imputer(&self) -> Option<&FittedRegressionImputer> {
        self.imputer.as_ref()
    }

    /// Columns produced by [`FittedTransform::transform`], in order.
    pub fn output_columns(&self) -> &[String] {
        self.feature.retained_columns()
    }

    /// Fail if any contained component carries no fitted state, or if a
    /// stored setting lies outside the domain its constructor accepts.
    pub fn validate(&self) -> Result<()> {
        self.check_is_fitted()?;
        self.config.validate()?;
        self.feature.check_is_fitted()?;
        self.feature.config().validate()?;
        if let Some(rare) = &self.rare {
            rare.check_is_fitted()?;
            rare.threshold().validate()?;
        }
        if let Some(imputer) = &self.imputer {
            imputer.check_is_fitted()?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let state: Self = serde_json::from_str(json)?;
        state.validate()?;
        Ok(state)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        info!("Saved preprocessor state to {}", path.display());
        Ok(())
    }

    /// Load a state written by [`FittedPreprocessor::save`].
    ///
    /// A state file that does not exist is reported as
    /// [`PreprocessingError::NotFitted`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PreprocessingError::NotFitted(Self::NAME.to_string())
                    .with_context(format!("no state file at {}", path.display())));
            }
            Err(e) => return Err(e.into()),
        };
        let state = Self::from_json(&json)
            .map_err(|e| e.with_context(format!("loading {}", path.display())))?;
        debug!(
            "Loaded preprocessor state fitted at {} (version {})",
            state.metadata.fitted_at, state.metadata.crate_version
        );
        Ok(state)
    }
}

impl FittedTransform for FittedPreprocessor {
    const NAME: &'static str = "Preprocessor";

    fn n_samples(&self) -> usize {
        self.metadata.n_samples
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        self.check_is_fitted()?;
        let mut out = self.feature.transform(df).context("feature pipeline")?;

        if let Some(rare) = &self.rare {
            out = rare.transform(&out).context("rare-category reducer")?;
        }

        if let Some(imputer) = &self.imputer {
            let imputed = imputer.transform(&out).context("regression imputer")?;
            for column in imputed.get_columns() {
                out.replace(
                    column.name().as_str(),
                    column.as_materialized_series().clone(),
                )?;
            }
        }

        Ok(out)
    }
}

/// Builder for [`Preprocessor`].
#[derive(Debug, Default)]
pub struct PreprocessorBuilder {
    config: Option<PreprocessorConfig>,
}

impl PreprocessorBuilder {
    /// Set the configuration. Defaults to [`PreprocessorConfig::default()`].
    pub fn config(mut self, config: PreprocessorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the preprocessor, validating the configuration.
    pub fn build(self) -> Result<Preprocessor> {
        Preprocessor::new(self.config.unwrap_or_default())
    }
}
