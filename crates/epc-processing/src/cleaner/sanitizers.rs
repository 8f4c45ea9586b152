//! Missing-value normalization.
//!
//! EPC exports mark absent values with free-text sentinels such as
//! `"NO DATA!"` or `"INVALID!"`, often followed by annotations and with
//! inconsistent casing. Matching is therefore a case-insensitive prefix test.

use crate::error::{PreprocessingError, Result};
use crate::transform::Cleaner;
use crate::utils::{column_names, is_string_dtype, to_string_series};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use tracing::debug;

/// Lowercase prefixes that denote a missing value.
pub const MISSING_PATTERNS: [&str; 6] = [
    "invalid!",
    "no data!",
    "nodata!",
    "not defined",
    "unknown",
    "sap05",
];

static MISSING_PATTERN_RE: Lazy<Regex> = Lazy::new(|| {
    let alternatives: Vec<String> = MISSING_PATTERNS.iter().map(|p| regex::escape(p)).collect();
    Regex::new(&format!("(?i)^(?:{})", alternatives.join("|")))
        .expect("Invalid regex: missing patterns")
});

/// Check if a raw cell value is one of the known missing-value sentinels.
///
/// # Example
///
/// ```rust,ignore
/// use epc_processing::cleaner::is_missing_pattern;
///
/// assert!(is_missing_pattern("NO DATA!"));
/// assert!(is_missing_pattern("Unknown (assumed)"));
/// assert!(!is_missing_pattern("Detached"));
/// ```
pub fn is_missing_pattern(value: &str) -> bool {
    MISSING_PATTERN_RE.is_match(value)
}

/// Replaces sentinel strings with missing values in a fixed set of columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingValueNormalizer {
    columns: Vec<String>,
}

impl MissingValueNormalizer {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Cleaner for MissingValueNormalizer {
    /// Columns outside the configured list, and non-text columns inside it,
    /// are returned untouched.
    fn clean(&self, df: &DataFrame) -> Result<DataFrame> {
        let present = column_names(df);
        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !present.contains(c))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(PreprocessingError::missing_columns(missing));
        }

        let mut df = df.clone();
        let mut total_replacements = 0;

        for col_name in &self.columns {
            let series = df.column(col_name)?.as_materialized_series();
            if !is_string_dtype(series.dtype()) {
                continue;
            }
            let (cleaned, count) = replace_missing_patterns(series)?;
            if count > 0 {
                total_replacements += count;
                df.replace(col_name, cleaned)?;
            }
        }

        if total_replacements > 0 {
            debug!(
                "Replaced {} missing-value sentinels across {} columns",
                total_replacements,
                self.columns.len()
            );
        }

        Ok(df)
    }
}

/// Replace sentinel cells of a text series with null, returning the replacement count.
fn replace_missing_patterns(series: &Series) -> Result<(Series, usize)> {
    let as_string = to_string_series(series)?;
    let str_series = as_string.str()?;
    let mut cleaned_values = Vec::with_capacity(str_series.len());
    let mut replacement_count = 0;

    for opt_val in str_series.into_iter() {
        match opt_val {
            Some(val) if is_missing_pattern(val) => {
                cleaned_values.push(None);
                replacement_count += 1;
            }
            Some(val) => cleaned_values.push(Some(val.to_string())),
            None => cleaned_values.push(None),
        }
    }

    // categorical inputs go back to their own dtype
    let cleaned = Series::new(series.name().clone(), cleaned_values).cast(series.dtype())?;
    Ok((cleaned, replacement_count))
}
