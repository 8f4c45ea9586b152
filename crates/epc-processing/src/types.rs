//! Learned-state data types shared across components.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Frequency tables
// ============================================================================

/// Occurrences of one value in the training table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub count: usize,
    /// `count` divided by the number of training rows, missing cells included.
    pub frequency: f64,
}

/// Value frequencies of one column, computed once at fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyTable {
    n_rows: usize,
    entries: BTreeMap<String, FrequencyEntry>,
}

impl FrequencyTable {
    /// Count the non-missing values of a string series.
    pub fn from_series(series: &Series) -> PolarsResult<Self> {
        let n_rows = series.len();
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for val in series.str()?.into_iter().flatten() {
            *counts.entry(val.to_string()).or_insert(0) += 1;
        }

        let entries = counts
            .into_iter()
            .map(|(value, count)| {
                let frequency = if n_rows == 0 {
                    0.0
                } else {
                    count as f64 / n_rows as f64
                };
                (value, FrequencyEntry { count, frequency })
            })
            .collect();

        Ok(Self { n_rows, entries })
    }

    pub fn get(&self, value: &str) -> Option<&FrequencyEntry> {
        self.entries.get(value)
    }

    /// Rows in the training table this table was computed from.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of distinct values seen at fit.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FrequencyEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A column name paired with its frequency table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFrequencies {
    pub column: String,
    pub table: FrequencyTable,
}

// ============================================================================
// Column selection
// ============================================================================

/// Why a column was removed at fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DropReason {
    /// The missing fraction exceeded the configured threshold.
    HighMissing { fraction: f64, threshold: f64 },
    /// The column is on the redundancy list.
    Redundant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedColumn {
    pub name: String,
    #[serde(flatten)]
    pub reason: DropReason,
}

/// Columns retained by the feature pipeline, in output order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnSelection {
    pub retained: Vec<String>,
    pub dropped: Vec<DroppedColumn>,
}

impl ColumnSelection {
    pub fn contains(&self, column: &str) -> bool {
        self.retained.iter().any(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.retained.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retained.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_table_counts_non_missing() {
        let series = Series::new("c".into(), &[Some("a"), Some("b"), Some("a"), None]);
        let table = FrequencyTable::from_series(&series).unwrap();

        assert_eq!(table.n_rows(), 4);
        assert_eq!(table.len(), 2);
        let a = table.get("a").unwrap();
        assert_eq!(a.count, 2);
        assert_eq!(a.frequency, 0.5);
        assert_eq!(table.get("b").unwrap().frequency, 0.25);
        assert!(table.get("c").is_none());
    }

    #[test]
    fn test_drop_reason_serialization() {
        let dropped = DroppedColumn {
            name: "FLOOR_HEIGHT".to_string(),
            reason: DropReason::HighMissing {
                fraction: 0.9,
                threshold: 0.7,
            },
        };
        let json = serde_json::to_value(&dropped).unwrap();
        assert_eq!(json["name"], "FLOOR_HEIGHT");
        assert_eq!(json["reason"], "high_missing");
        assert_eq!(json["fraction"], 0.9);
    }
}
