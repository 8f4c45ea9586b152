//! Configuration types for the EPC preprocessing pipeline.
//!
//! Column name sets are explicit configuration passed to constructors rather
//! than module-level constants. Every struct here has a `Default` describing
//! the EPC schema and round-trips through JSON, so a deployment can override
//! any list from a config file. [`PreprocessorConfig::builder()`] provides a
//! validating fluent API.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Default fraction of missing cells above which a column is dropped.
pub const DEFAULT_MISSING_THRESHOLD: f64 = 0.7;

/// Default minimum number of occurrences for a category to be kept.
pub const DEFAULT_RARE_COUNT: i64 = 10;

/// Suffix shared by the free-text description columns of the EPC schema.
pub const TEXT_SUFFIX: &str = "_DESCRIPTION";

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Named column groups of the input schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Numeric measurements.
    pub numeric: Vec<String>,
    /// Categorical codes and labels.
    pub categorical: Vec<String>,
    /// Free-text description columns.
    pub text: Vec<String>,
    /// Columns always dropped at fit because another column carries the same information.
    pub redundant: Vec<String>,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        let text_stems = ["WALLS", "ROOF", "FLOOR", "WINDOWS", "MAINHEAT", "HOTWATER", "LIGHTING"];
        Self {
            numeric: names(&[
                "TOTAL_FLOOR_AREA",
                "NUMBER_HABITABLE_ROOMS",
                "NUMBER_HEATED_ROOMS",
                "FIXED_LIGHTING_OUTLETS_COUNT",
                "LOW_ENERGY_LIGHTING",
                "MULTI_GLAZE_PROPORTION",
                "EXTENSION_COUNT",
                "NUMBER_OPEN_FIREPLACES",
            ]),
            categorical: names(&[
                "PROPERTY_TYPE",
                "BUILT_FORM",
                "CONSTRUCTION_AGE_BAND",
                "FLOOR_LEVEL",
                "MAIN_HEATING_CONTROLS",
                "MAINS_GAS_FLAG",
                "GLAZED_TYPE",
                "MAIN_FUEL",
                "TENURE",
                "TRANSACTION_TYPE",
            ]),
            text: text_stems
                .iter()
                .map(|stem| format!("{stem}{TEXT_SUFFIX}"))
                .collect(),
            redundant: names(&["LIGHTING_DESCRIPTION"]),
        }
    }
}

impl ColumnConfig {
    /// Columns an input table must contain, in selection order.
    pub fn required(&self, include_text: bool) -> Vec<String> {
        let mut required = Vec::with_capacity(
            self.numeric.len() + self.categorical.len() + self.text.len(),
        );
        required.extend(self.numeric.iter().cloned());
        required.extend(self.categorical.iter().cloned());
        if include_text {
            required.extend(self.text.iter().cloned());
        }
        required
    }

    /// Columns whose sentinel strings are normalized to missing.
    pub fn sentinel_columns(&self, include_text: bool) -> Vec<String> {
        let mut columns = self.categorical.clone();
        if include_text {
            columns.extend(self.text.iter().cloned());
        }
        columns
    }

    /// Reject a schema that names the same column twice.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let mut seen = HashSet::new();
        for name in self.required(true) {
            if !seen.insert(name.clone()) {
                return Err(ConfigValidationError::DuplicateColumn(name));
            }
        }
        Ok(())
    }
}

/// Columns rewritten by the field cleaners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldColumns {
    pub age_band: String,
    pub floor_level: String,
    pub heating_controls: String,
}

impl Default for FieldColumns {
    fn default() -> Self {
        Self {
            age_band: "CONSTRUCTION_AGE_BAND".to_string(),
            floor_level: "FLOOR_LEVEL".to_string(),
            heating_controls: "MAIN_HEATING_CONTROLS".to_string(),
        }
    }
}

/// Threshold below which a category counts as rare.
///
/// Serialized untagged: an integer JSON number is a count, a float is a frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RareThreshold {
    /// Minimum number of occurrences in the training table.
    Count(i64),
    /// Minimum share of training rows, strictly between 0 and 1.
    Frequency(f64),
}

impl Default for RareThreshold {
    fn default() -> Self {
        RareThreshold::Count(DEFAULT_RARE_COUNT)
    }
}

impl fmt::Display for RareThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RareThreshold::Count(n) => write!(f, "{n}"),
            RareThreshold::Frequency(freq) => write!(f, "{freq}"),
        }
    }
}

impl RareThreshold {
    /// Parse a threshold the way a user writes it: `"10"` is a count, `"0.05"` a frequency.
    pub fn parse(raw: &str) -> Result<Self, ConfigValidationError> {
        let raw = raw.trim();
        let threshold = if let Ok(count) = raw.parse::<i64>() {
            RareThreshold::Count(count)
        } else if let Ok(freq) = raw.parse::<f64>() {
            RareThreshold::Frequency(freq)
        } else {
            return Err(ConfigValidationError::InvalidRareThreshold(raw.to_string()));
        };
        threshold.validate()?;
        Ok(threshold)
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let valid = match *self {
            RareThreshold::Count(count) => count > 0,
            RareThreshold::Frequency(freq) => freq > 0.0 && freq < 1.0,
        };
        if valid {
            Ok(())
        } else {
            Err(ConfigValidationError::InvalidRareThreshold(self.to_string()))
        }
    }
}

/// Settings for the rare-category reducer stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RareCategoryConfig {
    /// Whether the preprocessor fits a reducer at all.
    pub enabled: bool,
    pub threshold: RareThreshold,
    /// Replacement for rare values; `None` writes a missing value.
    pub encoded_value: Option<String>,
}

impl Default for RareCategoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: RareThreshold::default(),
            encoded_value: None,
        }
    }
}

/// Predictor and target columns of the regression imputer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionImputerConfig {
    pub predictor: String,
    pub targets: Vec<String>,
}

impl Default for RegressionImputerConfig {
    fn default() -> Self {
        Self {
            predictor: "TOTAL_FLOOR_AREA".to_string(),
            targets: names(&[
                "NUMBER_HABITABLE_ROOMS",
                "NUMBER_HEATED_ROOMS",
                "FIXED_LIGHTING_OUTLETS_COUNT",
            ]),
        }
    }
}

impl RegressionImputerConfig {
    /// Predictor followed by the targets.
    pub fn input_columns(&self) -> Vec<String> {
        let mut columns = vec![self.predictor.clone()];
        columns.extend(self.targets.iter().cloned());
        columns
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.targets.is_empty() {
            return Err(ConfigValidationError::EmptyColumnList("targets".to_string()));
        }
        let mut seen = HashSet::new();
        for name in self.input_columns() {
            if !seen.insert(name.clone()) {
                return Err(ConfigValidationError::DuplicateColumn(name));
            }
        }
        Ok(())
    }
}

/// Settings for the feature selection orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePipelineConfig {
    pub columns: ColumnConfig,
    pub fields: FieldColumns,
    /// Whether free-text columns are required and kept.
    pub include_text: bool,
    /// Columns with a missing fraction above this value are dropped. Must lie in (0, 1].
    pub missing_threshold: f64,
}

impl Default for FeaturePipelineConfig {
    fn default() -> Self {
        Self {
            columns: ColumnConfig::default(),
            fields: FieldColumns::default(),
            include_text: true,
            missing_threshold: DEFAULT_MISSING_THRESHOLD,
        }
    }
}

impl FeaturePipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.missing_threshold > 0.0 && self.missing_threshold <= 1.0) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "missing_threshold".to_string(),
                value: self.missing_threshold,
            });
        }
        self.columns.validate()
    }
}

/// Configuration for the full preprocessor.
///
/// # Example
///
/// ```rust,ignore
/// use epc_processing::config::{PreprocessorConfig, RareThreshold};
///
/// let config = PreprocessorConfig::builder()
///     .missing_threshold(0.5)
///     .rare_threshold(RareThreshold::Frequency(0.01))
///     .include_text(false)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessorConfig {
    pub feature: FeaturePipelineConfig,
    pub rare: RareCategoryConfig,
    pub imputer: RegressionImputerConfig,
}

impl PreprocessorConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PreprocessorConfigBuilder {
        PreprocessorConfigBuilder::default()
    }

    /// Validate the configuration and return the first problem found.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.feature.validate()?;
        self.rare.threshold.validate()?;
        self.imputer.validate()
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be in (0.0, 1.0])")]
    InvalidThreshold { field: String, value: f64 },

    #[error(
        "Invalid rare-category threshold: {0} (must be a positive integer or a float in (0, 1))"
    )]
    InvalidRareThreshold(String),

    #[error("Column '{0}' is listed more than once")]
    DuplicateColumn(String),

    #[error("Column list '{0}' must not be empty")]
    EmptyColumnList(String),
}

/// Builder for [`PreprocessorConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PreprocessorConfigBuilder {
    columns: Option<ColumnConfig>,
    fields: Option<FieldColumns>,
    include_text: Option<bool>,
    missing_threshold: Option<f64>,
    rare_enabled: Option<bool>,
    rare_threshold: Option<RareThreshold>,
    rare_encoded_value: Option<String>,
    imputer: Option<RegressionImputerConfig>,
}

impl PreprocessorConfigBuilder {
    /// Replace the schema column groups.
    pub fn columns(mut self, columns: ColumnConfig) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Replace the columns targeted by the field cleaners.
    pub fn fields(mut self, fields: FieldColumns) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Include or exclude free-text columns.
    pub fn include_text(mut self, include: bool) -> Self {
        self.include_text = Some(include);
        self
    }

    /// Set the missing fraction above which columns are dropped.
    ///
    /// # Arguments
    /// * `threshold` - Value in (0.0, 1.0] (e.g., 0.7 = 70%)
    pub fn missing_threshold(mut self, threshold: f64) -> Self {
        self.missing_threshold = Some(threshold);
        self
    }

    /// Enable or disable rare-category reduction.
    pub fn rare_enabled(mut self, enabled: bool) -> Self {
        self.rare_enabled = Some(enabled);
        self
    }

    /// Set the rare-category threshold.
    pub fn rare_threshold(mut self, threshold: RareThreshold) -> Self {
        self.rare_threshold = Some(threshold);
        self
    }

    /// Replace rare categories with this label instead of a missing value.
    pub fn rare_encoded_value(mut self, value: impl Into<String>) -> Self {
        self.rare_encoded_value = Some(value.into());
        self
    }

    /// Replace the regression imputer columns.
    pub fn imputer(mut self, imputer: RegressionImputerConfig) -> Self {
        self.imputer = Some(imputer);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PreprocessorConfig` or an error if validation fails.
    pub fn build(self) -> Result<PreprocessorConfig, ConfigValidationError> {
        let config = PreprocessorConfig {
            feature: FeaturePipelineConfig {
                columns: self.columns.unwrap_or_default(),
                fields: self.fields.unwrap_or_default(),
                include_text: self.include_text.unwrap_or(true),
                missing_threshold: self.missing_threshold.unwrap_or(DEFAULT_MISSING_THRESHOLD),
            },
            rare: RareCategoryConfig {
                enabled: self.rare_enabled.unwrap_or(true),
                threshold: self.rare_threshold.unwrap_or_default(),
                encoded_value: self.rare_encoded_value,
            },
            imputer: self.imputer.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
