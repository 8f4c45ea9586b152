//! EPC Preprocessing Library
//!
//! Cleaning, feature selection and imputation for Energy Performance
//! Certificate records, built on Polars.
//!
//! # Overview
//!
//! - **Sentinel normalization**: free-text missing markers such as
//!   `"NO DATA!"` become real missing values
//! - **Field cleaning**: construction age band, floor level and heating
//!   controls are recoded into canonical values
//! - **Feature selection**: mostly-missing and redundant columns are dropped
//!   at fit and the same selection is replayed at transform
//! - **Rare-category reduction**: infrequent categorical values collapse into
//!   one encoded value
//! - **Regression imputation**: missing room counts are predicted from the
//!   floor area
//!
//! Stateful components follow a fit/transform split: an [`Estimator`] holds
//! configuration and `fit` returns an immutable fitted value implementing
//! [`FittedTransform`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use epc_processing::{Estimator, FittedTransform, Preprocessor, PreprocessorConfig};
//! use polars::prelude::*;
//!
//! let config = PreprocessorConfig::builder()
//!     .missing_threshold(0.5)
//!     .include_text(false)
//!     .build()?;
//!
//! let fitted = Preprocessor::builder().config(config).build()?.fit(&train)?;
//! for dropped in fitted.feature_pipeline().dropped_columns() {
//!     println!("dropped {}: {:?}", dropped.name, dropped.reason);
//! }
//!
//! let features = fitted.transform(&new_records)?;
//! fitted.save("state.json")?;
//! ```
//!
//! # Individual components
//!
//! ```rust,ignore
//! use epc_processing::cleaner::{FieldCleaners, MissingValueNormalizer};
//! use epc_processing::reducers::RareCategoryReducer;
//! use epc_processing::{Cleaner, Estimator, FittedTransform, RareThreshold};
//!
//! let normalized = MissingValueNormalizer::new(vec!["BUILT_FORM".into()]).clean(&df)?;
//! let cleaned = FieldCleaners::default().clean(&normalized)?;
//!
//! let reducer = RareCategoryReducer::new(RareThreshold::Frequency(0.01), Some("Other".into()))?;
//! let reduced = reducer.fit(&cleaned)?.transform(&cleaned)?;
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod imputers;
pub mod pipeline;
pub mod reducers;
pub mod transform;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{CellOutcome, FieldCleaners, FieldRule, MissingValueNormalizer, UnparsedPolicy};
pub use config::{
    ColumnConfig, ConfigValidationError, FeaturePipelineConfig, FieldColumns, PreprocessorConfig,
    PreprocessorConfigBuilder, RareCategoryConfig, RareThreshold, RegressionImputerConfig,
};
pub use error::{PreprocessingError, Result as PreprocessingResult, ResultExt};
pub use imputers::{FittedRegressionImputer, ModelDiagnostics, RegressionImputer};
pub use pipeline::{
    FeaturePipeline, FittedFeaturePipeline, FittedPreprocessor, Preprocessor, PreprocessorBuilder,
    StateMetadata,
};
pub use reducers::{FittedRareCategoryReducer, RareCategoryReducer};
pub use transform::{Cleaner, Estimator, FittedTransform};
pub use types::{ColumnSelection, DropReason, DroppedColumn, FrequencyEntry, FrequencyTable};
