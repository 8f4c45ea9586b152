//! Pipeline orchestration.
//!
//! - [`FeaturePipeline`]: schema validation, sentinel normalization, column
//!   selection and field cleaning
//! - [`Preprocessor`]: the feature pipeline followed by rare-category
//!   reduction and regression imputation, with JSON persistence

mod builder;
mod feature;

pub use builder::{FittedPreprocessor, Preprocessor, PreprocessorBuilder, StateMetadata};
pub use feature::{FeaturePipeline, FittedFeaturePipeline};
