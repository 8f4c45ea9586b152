//! Rare-category collapsing.
//!
//! Fit counts every value of every column; transform replaces values whose
//! training count (or frequency) is strictly below the threshold with an
//! encoded value. Values never seen at fit are treated as rare.

use crate::config::{RareCategoryConfig, RareThreshold};
use crate::error::{PreprocessingError, Result};
use crate::transform::{Estimator, FittedTransform};
use crate::types::{ColumnFrequencies, FrequencyEntry, FrequencyTable};
use crate::utils::{check_required_columns, column_names, ensure_non_empty, to_string_series};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Unfitted rare-category reducer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RareCategoryReducer {
    threshold: RareThreshold,
    encoded_value: Option<String>,
}

impl RareCategoryReducer {
    /// Create a reducer, rejecting thresholds outside their domain.
    ///
    /// `encoded_value` replaces rare cells; `None` writes a missing value.
    pub fn new(threshold: RareThreshold, encoded_value: Option<String>) -> Result<Self> {
        threshold.validate()?;
        Ok(Self {
            threshold,
            encoded_value,
        })
    }

    pub fn from_config(config: &RareCategoryConfig) -> Result<Self> {
        Self::new(config.threshold, config.encoded_value.clone())
    }

    pub fn threshold(&self) -> RareThreshold {
        self.threshold
    }
}

impl Estimator for RareCategoryReducer {
    type Fitted = FittedRareCategoryReducer;

    /// Every column is read in its string form.
    fn fit(&self, df: &DataFrame) -> Result<FittedRareCategoryReducer> {
        ensure_non_empty(df, FittedRareCategoryReducer::NAME)?;

        let mut tables = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let as_string = to_string_series(column.as_materialized_series())?;
            let table = FrequencyTable::from_series(&as_string)?;
            tables.push(ColumnFrequencies {
                column: column.name().to_string(),
                table,
            });
        }

        let fitted = FittedRareCategoryReducer {
            threshold: self.threshold,
            encoded_value: self.encoded_value.clone(),
            n_samples: df.height(),
            tables,
        };

        for entry in &fitted.tables {
            let rare = fitted.rare_values(&entry.column).len();
            debug!(
                "'{}': {} distinct values, {} below threshold {}",
                entry.column,
                entry.table.len(),
                rare,
                self.threshold
            );
        }
        info!(
            "Fitted rare-category reducer on {} columns ({} rows)",
            fitted.tables.len(),
            fitted.n_samples
        );

        Ok(fitted)
    }
}

/// Rare-category reducer with learned frequency tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedRareCategoryReducer {
    threshold: RareThreshold,
    encoded_value: Option<String>,
    n_samples: usize,
    tables: Vec<ColumnFrequencies>,
}

impl FittedRareCategoryReducer {
    /// Columns that have a frequency table, in fit order.
    pub fn columns(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.column.as_str()).collect()
    }

    pub fn table(&self, column: &str) -> Option<&FrequencyTable> {
        self.tables
            .iter()
            .find(|t| t.column == column)
            .map(|t| &t.table)
    }

    pub fn threshold(&self) -> RareThreshold {
        self.threshold
    }

    pub fn encoded_value(&self) -> Option<&str> {
        self.encoded_value.as_deref()
    }

    fn below_threshold(&self, entry: Option<&FrequencyEntry>) -> bool {
        match (entry, self.threshold) {
            (None, _) => true,
            (Some(e), RareThreshold::Count(min)) => (e.count as i64) < min,
            (Some(e), RareThreshold::Frequency(min)) => e.frequency < min,
        }
    }

    /// Whether `value` would be replaced in `column`.
    ///
    /// Columns without a table never replace anything.
    pub fn is_rare(&self, column: &str, value: &str) -> bool {
        self.table(column)
            .map(|table| self.below_threshold(table.get(value)))
            .unwrap_or(false)
    }

    /// Values seen at fit in `column` that fall below the threshold.
    pub fn rare_values(&self, column: &str) -> Vec<&str> {
        self.table(column)
            .map(|table| {
                table
                    .iter()
                    .filter(|(_, entry)| self.below_threshold(Some(*entry)))
                    .map(|(value, _)| value)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl FittedTransform for FittedRareCategoryReducer {
    const NAME: &'static str = "RareCategoryReducer";

    fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Fitted columns come back as strings; other columns are untouched.
    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        self.check_is_fitted()?;
        let fitted_columns: Vec<String> = self.tables.iter().map(|t| t.column.clone()).collect();
        check_required_columns(df, &fitted_columns)?;
        if df.width() == 0 {
            return Err(PreprocessingError::InvalidInput(
                "RareCategoryReducer cannot transform a table with no columns".to_string(),
            ));
        }

        let mut result = df.clone();
        let mut total_replaced = 0usize;

        for entry in &self.tables {
            let series = df.column(&entry.column)?.as_materialized_series();
            let as_string = to_string_series(series)?;
            let str_series = as_string.str()?;

            let mut values: Vec<Option<String>> = Vec::with_capacity(str_series.len());
            let mut replaced = 0usize;
            for opt_val in str_series.into_iter() {
                match opt_val {
                    Some(val) if self.below_threshold(entry.table.get(val)) => {
                        values.push(self.encoded_value.clone());
                        replaced += 1;
                    }
                    Some(val) => values.push(Some(val.to_string())),
                    None => values.push(None),
                }
            }

            if replaced > 0 {
                debug!("Replaced {} rare values in '{}'", replaced, entry.column);
            }
            total_replaced += replaced;
            result.replace(&entry.column, Series::new(series.name().clone(), values))?;
        }

        debug!(
            "Rare-category reduction replaced {} cells across {} of {} columns",
            total_replaced,
            self.tables.len(),
            column_names(df).len()
        );

        Ok(result)
    }
}

static_assertions::assert_impl_all!(FittedRareCategoryReducer: Send, Sync);
