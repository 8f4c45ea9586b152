//! Shared utilities for the preprocessing pipeline.
//!
//! Schema checks, missing-value statistics and series conversions used by
//! more than one component.

use crate::error::{PreprocessingError, Result};
use polars::prelude::*;
use std::collections::HashSet;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType holds text.
#[inline]
pub fn is_string_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String | DataType::Categorical(_, _))
}

// =============================================================================
// Schema Utilities
// =============================================================================

/// Column names of a DataFrame as owned strings.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}

/// Fail with [`PreprocessingError::SchemaMismatch`] unless every required
/// column is present exactly once.
pub fn check_required_columns(df: &DataFrame, required: &[String]) -> Result<()> {
    let names = column_names(df);

    let mut seen = HashSet::with_capacity(names.len());
    let mut duplicated: Vec<String> = Vec::new();
    for name in &names {
        if !seen.insert(name.as_str()) && !duplicated.contains(name) {
            duplicated.push(name.clone());
        }
    }
    duplicated.retain(|name| required.contains(name));

    let missing: Vec<String> = required
        .iter()
        .filter(|name| !seen.contains(name.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() && duplicated.is_empty() {
        Ok(())
    } else {
        Err(PreprocessingError::SchemaMismatch {
            missing,
            duplicated,
        })
    }
}

/// Fail with [`PreprocessingError::InvalidInput`] when a table has no rows or no columns.
pub fn ensure_non_empty(df: &DataFrame, component: &str) -> Result<()> {
    if df.width() == 0 {
        return Err(PreprocessingError::InvalidInput(format!(
            "{component} requires a table with at least one column"
        )));
    }
    if df.height() == 0 {
        return Err(PreprocessingError::InvalidInput(format!(
            "{component} requires a table with at least one row"
        )));
    }
    Ok(())
}

// =============================================================================
// Series Utilities
// =============================================================================

/// Fraction of missing cells in a series. An empty series has none.
pub fn missing_fraction(series: &Series) -> f64 {
    if series.is_empty() {
        0.0
    } else {
        series.null_count() as f64 / series.len() as f64
    }
}

/// Cast any series to its string form, keeping missing cells missing.
pub fn to_string_series(series: &Series) -> PolarsResult<Series> {
    if series.dtype() == &DataType::String {
        Ok(series.clone())
    } else {
        series.cast(&DataType::String)
    }
}

/// Rewrite every non-missing cell of a series through `f`; `None` from `f` marks the cell missing.
///
/// The series is read in its string form, so numeric input is accepted.
pub fn map_string_cells<F>(series: &Series, mut f: F) -> PolarsResult<Series>
where
    F: FnMut(&str) -> Option<String>,
{
    let as_string = to_string_series(series)?;
    let str_series = as_string.str()?;
    let mut values: Vec<Option<String>> = Vec::with_capacity(str_series.len());

    for opt_val in str_series.into_iter() {
        values.push(opt_val.and_then(&mut f));
    }

    Ok(Series::new(series.name().clone(), values))
}

/// Read a column as `f64` values.
///
/// Numeric columns are cast; string columns must contain only numeric text.
pub fn numeric_values(series: &Series) -> Result<Vec<Option<f64>>> {
    let dtype = series.dtype();
    if is_numeric_dtype(dtype) || dtype == &DataType::Null {
        let float_series = series.cast(&DataType::Float64)?;
        return Ok(float_series.f64()?.into_iter().collect());
    }

    if dtype == &DataType::String {
        let str_series = series.str()?;
        let mut values = Vec::with_capacity(str_series.len());
        for opt_val in str_series.into_iter() {
            match opt_val {
                Some(val) => {
                    let parsed = val.trim().parse::<f64>().map_err(|_| {
                        PreprocessingError::InvalidInput(format!(
                            "column '{}' contains non-numeric value '{}'",
                            series.name(),
                            val
                        ))
                    })?;
                    values.push(Some(parsed));
                }
                None => values.push(None),
            }
        }
        return Ok(values);
    }

    Err(PreprocessingError::InvalidInput(format!(
        "column '{}' has type {} but a numeric column is required",
        series.name(),
        dtype
    )))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_check_required_columns_reports_missing() {
        let df = df![
            "a" => [1, 2],
            "b" => ["x", "y"],
        ]
        .unwrap();

        assert!(check_required_columns(&df, &["a".to_string()]).is_ok());

        let err = check_required_columns(&df, &["a".to_string(), "c".to_string(), "d".to_string()])
            .unwrap_err();
        match err {
            PreprocessingError::SchemaMismatch {
                missing,
                duplicated,
            } => {
                assert_eq!(missing, vec!["c".to_string(), "d".to_string()]);
                assert!(duplicated.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ensure_non_empty() {
        let df = df!["a" => Vec::<i64>::new()].unwrap();
        assert!(matches!(
            ensure_non_empty(&df, "test"),
            Err(PreprocessingError::InvalidInput(_))
        ));
        assert!(ensure_non_empty(&DataFrame::empty(), "test").is_err());
    }

    #[test]
    fn test_missing_fraction() {
        let series = Series::new("v".into(), &[Some(1.0), None, None, Some(4.0)]);
        assert_eq!(missing_fraction(&series), 0.5);
        let empty = Series::new_empty("e".into(), &DataType::Float64);
        assert_eq!(missing_fraction(&empty), 0.0);
    }

    #[test]
    fn test_map_string_cells_keeps_nulls() {
        let series = Series::new("v".into(), &[Some("a"), None, Some("b")]);
        let mapped = map_string_cells(&series, |s| {
            if s == "b" { None } else { Some(s.to_uppercase()) }
        })
        .unwrap();
        let values: Vec<Option<&str>> = mapped.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("A"), None, None]);
    }

    #[test]
    fn test_map_string_cells_accepts_numeric() {
        let series = Series::new("v".into(), &[Some(3i64), None]);
        let mapped = map_string_cells(&series, |s| Some(format!("{s}!"))).unwrap();
        assert_eq!(mapped.str().unwrap().get(0), Some("3!"));
        assert_eq!(mapped.null_count(), 1);
    }

    #[test]
    fn test_numeric_values() {
        let ints = Series::new("n".into(), &[Some(1i64), None, Some(3)]);
        assert_eq!(numeric_values(&ints).unwrap(), vec![Some(1.0), None, Some(3.0)]);

        let text = Series::new("t".into(), &[Some(" 2.5"), None]);
        assert_eq!(numeric_values(&text).unwrap(), vec![Some(2.5), None]);

        let bad = Series::new("t".into(), &["abc"]);
        assert!(matches!(
            numeric_values(&bad),
            Err(PreprocessingError::InvalidInput(_))
        ));
    }
}
