//! Cardinality reduction for categorical columns.

mod rare;

pub use rare::{FittedRareCategoryReducer, RareCategoryReducer};
