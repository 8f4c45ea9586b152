//! Fit/transform contracts shared by every pipeline component.
//!
//! Stateful components are split in two types: an unfitted estimator that
//! holds configuration, and an immutable fitted value produced by
//! [`Estimator::fit`]. Learned state never lives in a mutable field, so a
//! fitted value can be shared across threads and reused for any number of
//! transforms.

use crate::error::{PreprocessingError, Result};
use polars::prelude::*;

/// A stateless table rewrite.
pub trait Cleaner {
    /// Produce a cleaned copy of `df`. The input is never modified.
    fn clean(&self, df: &DataFrame) -> Result<DataFrame>;
}

/// An unfitted, configured component that learns state from a training table.
pub trait Estimator {
    /// The fitted value produced by [`Estimator::fit`].
    type Fitted: FittedTransform;

    /// Learn state from `df`.
    fn fit(&self, df: &DataFrame) -> Result<Self::Fitted>;

    /// Fit on `df` and transform the same table.
    fn fit_transform(&self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?.transform(df)
    }
}

/// A fitted component ready to transform new tables.
pub trait FittedTransform {
    /// Component name used in diagnostics.
    const NAME: &'static str;

    /// Number of training rows seen at fit. Zero means the state was never fitted.
    fn n_samples(&self) -> usize;

    /// Apply the learned state to `df`, returning a new table.
    fn transform(&self, df: &DataFrame) -> Result<DataFrame>;

    /// Fail with [`PreprocessingError::NotFitted`] if no fit has completed.
    ///
    /// Fitted values built by `fit` always pass; values restored from
    /// serialized state may not.
    fn check_is_fitted(&self) -> Result<()> {
        if self.n_samples() == 0 {
            Err(PreprocessingError::NotFitted(Self::NAME.to_string()))
        } else {
            Ok(())
        }
    }
}
