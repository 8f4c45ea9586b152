//! Custom error types for the EPC preprocessing pipeline.
//!
//! This module provides a single error hierarchy using `thiserror`.
//! Fatal conditions (bad input, schema mismatch, invalid configuration,
//! unfitted state) are raised synchronously by the call that detects them.
//! Per-cell coercion failures are not errors: they are reported through
//! [`crate::cleaner::CellOutcome`] and degrade at cell granularity.
//!
//! Errors are serializable so a caller can forward them as `{code, message}`.

use crate::config::ConfigValidationError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the preprocessing pipeline.
#[derive(Error, Debug)]
pub enum PreprocessingError {
    /// Input is not usable as a table (no rows, no columns, wrong column type).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Required columns are absent from, or duplicated in, the input table.
    #[error("Schema mismatch: missing columns {missing:?}, duplicated columns {duplicated:?}")]
    SchemaMismatch {
        missing: Vec<String>,
        duplicated: Vec<String>,
    },

    /// Invalid configuration provided at construction.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// `transform` was called on a component whose fit has not completed.
    #[error("{0} is not fitted yet; call fit before transform")]
    NotFitted(String),

    /// A regression model could not be fitted for a target column.
    #[error("Failed to fit imputation model for column '{column}': {reason}")]
    ImputationFailed { column: String, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PreprocessingError>,
    },
}

impl PreprocessingError {
    /// Build a [`PreprocessingError::SchemaMismatch`] for columns that are absent.
    pub fn missing_columns(missing: Vec<String>) -> Self {
        PreprocessingError::SchemaMismatch {
            missing,
            duplicated: Vec::new(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PreprocessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for callers that dispatch on the error kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::NotFitted(_) => "NOT_FITTED",
            Self::ImputationFailed { .. } => "IMPUTATION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error is a schema mismatch, looking through context wrappers.
    pub fn is_schema_mismatch(&self) -> bool {
        match self {
            Self::SchemaMismatch { .. } => true,
            Self::WithContext { source, .. } => source.is_schema_mismatch(),
            _ => false,
        }
    }

    /// Check if this error reports an unfitted component, looking through context wrappers.
    pub fn is_not_fitted(&self) -> bool {
        match self {
            Self::NotFitted(_) => true,
            Self::WithContext { source, .. } => source.is_not_fitted(),
            _ => false,
        }
    }
}

impl From<ConfigValidationError> for PreprocessingError {
    fn from(err: ConfigValidationError) -> Self {
        PreprocessingError::InvalidConfig(err.to_string())
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PreprocessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PreprocessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for preprocessing operations.
pub type Result<T> = std::result::Result<T, PreprocessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PreprocessingError::Polars(e).with_context(context))
    }
}
