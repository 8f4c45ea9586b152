//! Data cleaning module for EPC records.
//!
//! This module provides:
//! - Missing-value sentinel normalization ([`MissingValueNormalizer`])
//! - Field recoding rules for construction age band, floor level and
//!   heating controls ([`FieldCleaners`])

mod converters;
mod sanitizers;

pub use converters::{
    AGE_BAND_LOCALE_PREFIX, BASEMENT, CellOutcome, EARLIEST_AGE_BAND, GROUND_FLOOR,
    RECENT_AGE_BAND, TOP_FLOOR_BAND, UnparsedPolicy, age_band_for_year, clean_age_band,
    clean_floor_level, clean_heating_controls, floor_ordinal, is_canonical_age_band,
};
pub use sanitizers::{MISSING_PATTERNS, MissingValueNormalizer, is_missing_pattern};

use crate::config::FieldColumns;
use crate::error::Result;
use crate::transform::Cleaner;
use crate::utils::map_string_cells;
use polars::prelude::*;
use tracing::{debug, warn};

/// A column-specific recoding rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    AgeBand,
    FloorLevel,
    HeatingControls,
}

impl FieldRule {
    /// Recode one non-missing cell.
    pub fn apply(&self, raw: &str) -> CellOutcome {
        match self {
            FieldRule::AgeBand => clean_age_band(raw),
            FieldRule::FloorLevel => clean_floor_level(raw),
            FieldRule::HeatingControls => clean_heating_controls(raw),
        }
    }

    /// How cells this rule cannot coerce are written back.
    pub fn policy(&self) -> UnparsedPolicy {
        match self {
            FieldRule::AgeBand | FieldRule::FloorLevel => UnparsedPolicy::PassThrough,
            FieldRule::HeatingControls => UnparsedPolicy::Substitute,
        }
    }

    /// Rewrite `column` of `df` in place. Missing cells are left untouched.
    fn clean_column(&self, df: &mut DataFrame, column: &str) -> Result<()> {
        let policy = self.policy();
        let mut unparsed = 0usize;
        let mut first_unparsed: Option<String> = None;

        let cleaned = {
            let series = df.column(column)?.as_materialized_series();
            map_string_cells(series, |raw| {
                let outcome = self.apply(raw);
                if outcome.is_unparsed() {
                    unparsed += 1;
                    first_unparsed.get_or_insert_with(|| raw.to_string());
                }
                outcome.resolve(policy)
            })?
        };
        df.replace(column, cleaned)?;

        if unparsed > 0 {
            let action = match policy {
                UnparsedPolicy::PassThrough => "kept as-is",
                UnparsedPolicy::Substitute => "set to missing",
            };
            warn!(
                "{} value(s) in '{}' could not be recoded and were {} (first: {:?})",
                unparsed,
                column,
                action,
                first_unparsed.unwrap_or_default()
            );
        }

        Ok(())
    }
}

/// Applies the three field rules to their configured columns.
///
/// A configured column absent from the table is skipped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldCleaners {
    columns: FieldColumns,
}

impl FieldCleaners {
    pub fn new(columns: FieldColumns) -> Self {
        Self { columns }
    }

    fn rules(&self) -> [(FieldRule, &str); 3] {
        [
            (FieldRule::AgeBand, self.columns.age_band.as_str()),
            (FieldRule::FloorLevel, self.columns.floor_level.as_str()),
            (FieldRule::HeatingControls, self.columns.heating_controls.as_str()),
        ]
    }
}

impl Cleaner for FieldCleaners {
    fn clean(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut df = df.clone();
        for (rule, column) in self.rules() {
            if df.column(column).is_err() {
                debug!("Skipping {:?} cleaner: column '{}' not present", rule, column);
                continue;
            }
            rule.clean_column(&mut df, column)?;
        }
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(df: &DataFrame, column: &str) -> Vec<Option<String>> {
        df.column(column)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect()
    }

    #[test]
    fn test_field_cleaners_apply_all_rules() {
        let df = df![
            "CONSTRUCTION_AGE_BAND" => [Some("England and Wales: 1925"), None, Some("pre-war")],
            "FLOOR_LEVEL" => [Some("Ground Floor"), Some("-1"), None],
            "MAIN_HEATING_CONTROLS" => [Some("2106"), Some("thermostat"), None],
            "TENURE" => ["owner-occupied", "rental (social)", "rental (private)"],
        ]
        .unwrap();

        let cleaned = FieldCleaners::default().clean(&df).unwrap();

        assert_eq!(
            strings(&cleaned, "CONSTRUCTION_AGE_BAND"),
            vec![Some("1900-1929".to_string()), None, Some("pre-war".to_string())]
        );
        assert_eq!(
            strings(&cleaned, "FLOOR_LEVEL"),
            vec![Some("0".to_string()), Some("basement".to_string()), None]
        );
        assert_eq!(
            strings(&cleaned, "MAIN_HEATING_CONTROLS"),
            vec![Some("2106".to_string()), None, None]
        );
        assert!(cleaned.column("TENURE").unwrap().as_materialized_series().equals(
            df.column("TENURE").unwrap().as_materialized_series()
        ));
    }

    #[test]
    fn test_field_cleaners_accept_numeric_columns() {
        let df = df![
            "CONSTRUCTION_AGE_BAND" => [Some(1899i64), Some(2010), None],
            "FLOOR_LEVEL" => [Some(3i64), Some(21), Some(0)],
            "MAIN_HEATING_CONTROLS" => [Some(2106.0f64), None, Some(2104.0)],
        ]
        .unwrap();

        let cleaned = FieldCleaners::default().clean(&df).unwrap();

        assert_eq!(
            strings(&cleaned, "CONSTRUCTION_AGE_BAND"),
            vec![Some("before 1900".to_string()), Some("2007 onwards".to_string()), None]
        );
        assert_eq!(
            strings(&cleaned, "FLOOR_LEVEL"),
            vec![Some("3rd".to_string()), Some("21st".to_string()), Some("0".to_string())]
        );
        assert_eq!(
            strings(&cleaned, "MAIN_HEATING_CONTROLS"),
            vec![Some("2106".to_string()), None, Some("2104".to_string())]
        );
    }

    #[test]
    fn test_field_cleaners_skip_absent_columns() {
        let df = df!["FLOOR_LEVEL" => ["2"]].unwrap();
        let cleaned = FieldCleaners::default().clean(&df).unwrap();
        assert_eq!(strings(&cleaned, "FLOOR_LEVEL"), vec![Some("2nd".to_string())]);
        assert_eq!(cleaned.width(), 1);
    }

    #[test]
    fn test_blank_heating_controls_are_missing_not_unparsed() {
        assert_eq!(FieldRule::HeatingControls.apply("  "), CellOutcome::Missing);
        assert!(FieldRule::FloorLevel.apply("  ").is_unparsed());
    }

    #[test]
    fn test_rule_policies() {
        assert_eq!(FieldRule::AgeBand.policy(), UnparsedPolicy::PassThrough);
        assert_eq!(FieldRule::FloorLevel.policy(), UnparsedPolicy::PassThrough);
        assert_eq!(FieldRule::HeatingControls.policy(), UnparsedPolicy::Substitute);
    }
}
