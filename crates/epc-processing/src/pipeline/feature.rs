//! Feature selection over the EPC schema.
//!
//! Fit validates the schema, normalizes sentinel strings and drops columns
//! that are mostly missing or redundant. Transform replays the same steps on
//! new data, applies the field cleaners and returns the retained columns in
//! their fitted order.

use crate::cleaner::{FieldCleaners, MissingValueNormalizer};
use crate::config::FeaturePipelineConfig;
use crate::error::Result;
use crate::transform::{Cleaner, Estimator, FittedTransform};
use crate::types::{ColumnSelection, DropReason, DroppedColumn};
use crate::utils::{check_required_columns, ensure_non_empty, missing_fraction};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Unfitted feature pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeaturePipeline {
    config: FeaturePipelineConfig,
}

impl FeaturePipeline {
    pub fn new(config: FeaturePipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FeaturePipelineConfig {
        &self.config
    }
}

fn required_columns(config: &FeaturePipelineConfig) -> Vec<String> {
    config.columns.required(config.include_text)
}

fn normalizer(config: &FeaturePipelineConfig) -> MissingValueNormalizer {
    MissingValueNormalizer::new(config.columns.sentinel_columns(config.include_text))
}

impl Estimator for FeaturePipeline {
    type Fitted = FittedFeaturePipeline;

    fn fit(&self, df: &DataFrame) -> Result<FittedFeaturePipeline> {
        info!("Step 1: Validating input schema...");
        let required = required_columns(&self.config);
        check_required_columns(df, &required)?;
        ensure_non_empty(df, FittedFeaturePipeline::NAME)?;

        info!("Step 2: Normalizing missing-value sentinels...");
        let restricted = df.select(required.iter().map(String::as_str))?;
        let normalized = normalizer(&self.config).clean(&restricted)?;

        info!("Step 3: Selecting columns...");
        let threshold = self.config.missing_threshold;
        let mut selection = ColumnSelection::default();

        for name in &required {
            if self.config.columns.redundant.contains(name) {
                selection.dropped.push(DroppedColumn {
                    name: name.clone(),
                    reason: DropReason::Redundant,
                });
                continue;
            }

            let fraction = missing_fraction(normalized.column(name)?.as_materialized_series());
            if fraction > threshold {
                debug!(
                    "Dropping '{}': {:.1}% missing (threshold {:.1}%)",
                    name,
                    fraction * 100.0,
                    threshold * 100.0
                );
                selection.dropped.push(DroppedColumn {
                    name: name.clone(),
                    reason: DropReason::HighMissing {
                        fraction,
                        threshold,
                    },
                });
            } else {
                selection.retained.push(name.clone());
            }
        }

        info!(
            "Retained {} of {} columns ({} dropped)",
            selection.retained.len(),
            required.len(),
            selection.dropped.len()
        );

        Ok(FittedFeaturePipeline {
            config: self.config.clone(),
            selection,
            n_samples: df.height(),
        })
    }
}

/// Feature pipeline with a learned column selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedFeaturePipeline {
    config: FeaturePipelineConfig,
    selection: ColumnSelection,
    n_samples: usize,
}

impl FittedFeaturePipeline {
    pub fn config(&self) -> &FeaturePipelineConfig {
        &self.config
    }

    pub fn selection(&self) -> &ColumnSelection {
        &self.selection
    }

    /// Output columns, in order.
    pub fn retained_columns(&self) -> &[String] {
        &self.selection.retained
    }

    pub fn dropped_columns(&self) -> &[DroppedColumn] {
        &self.selection.dropped
    }
}

impl FittedTransform for FittedFeaturePipeline {
    const NAME: &'static str = "FeaturePipeline";

    fn n_samples(&self) -> usize {
        self.n_samples
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        self.check_is_fitted()?;
        let required = required_columns(&self.config);
        check_required_columns(df, &required)?;

        let restricted = df.select(required.iter().map(String::as_str))?;
        let normalized = normalizer(&self.config).clean(&restricted)?;
        let cleaned = FieldCleaners::new(self.config.fields.clone()).clean(&normalized)?;

        debug!(
            "Feature transform: {} rows, {} columns retained",
            cleaned.height(),
            self.selection.retained.len()
        );
        Ok(cleaned.select(self.selection.retained.iter().map(String::as_str))?)
    }
}

static_assertions::assert_impl_all!(FittedFeaturePipeline: Send, Sync);
