//! Integration tests for the EPC preprocessing pipeline.
//!
//! These tests fit and replay the full chain on a small EPC extract.

use epc_processing::{
    DropReason, Estimator, FittedPreprocessor, FittedTransform, Preprocessor, PreprocessorConfig,
    RareThreshold,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Arc;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_csv(filename: &str) -> DataFrame {
    let path = fixtures_path().join(filename);
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path))
        .expect("Failed to create CSV reader")
        .finish()
        .expect("Failed to read CSV file")
}

fn load_sample() -> DataFrame {
    load_csv("epc_sample.csv")
}

fn fit(config: PreprocessorConfig) -> FittedPreprocessor {
    Preprocessor::builder()
        .config(config)
        .build()
        .unwrap()
        .fit(&load_sample())
        .unwrap()
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

fn strings(df: &DataFrame, column: &str) -> Vec<Option<String>> {
    df.column(column)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect()
}

fn floats(df: &DataFrame, column: &str) -> Vec<Option<f64>> {
    df.column(column)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

// ============================================================================
// Column selection
// ============================================================================

#[test]
fn test_fit_drops_sparse_and_redundant_columns() {
    let fitted = fit(PreprocessorConfig::default());
    let selection = fitted.feature_pipeline().selection();

    let dropped: Vec<&str> = selection.dropped.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(
        dropped,
        vec!["NUMBER_OPEN_FIREPLACES", "MAINS_GAS_FLAG", "LIGHTING_DESCRIPTION"]
    );
    assert!(matches!(
        selection.dropped[1].reason,
        DropReason::HighMissing { fraction, threshold } if fraction == 0.8 && threshold == 0.7
    ));
    assert_eq!(selection.dropped[2].reason, DropReason::Redundant);

    // columns outside the schema are never selected
    assert!(!selection.contains("LMK_KEY"));
    assert!(!selection.contains("FLOOR_HEIGHT"));
    assert_eq!(selection.len(), 22);
}

#[test]
fn test_transform_returns_selection_in_order() {
    let fitted = fit(PreprocessorConfig::default());
    let out = fitted.transform(&load_sample()).unwrap();

    assert_eq!(column_names(&out), fitted.output_columns().to_vec());
    assert_eq!(out.height(), 40);
}

#[test]
fn test_fit_without_categorical_column_is_schema_mismatch() {
    let mut df = load_sample();
    df.drop_in_place("BUILT_FORM").unwrap();

    let err = Preprocessor::builder()
        .build()
        .unwrap()
        .fit(&df)
        .unwrap_err();
    assert!(err.is_schema_mismatch());
    assert_eq!(err.error_code(), "SCHEMA_MISMATCH");
}

#[test]
fn test_text_columns_optional_when_excluded() {
    let mut df = load_sample();
    for column in ["WALLS_DESCRIPTION", "ROOF_DESCRIPTION", "LIGHTING_DESCRIPTION"] {
        df.drop_in_place(column).unwrap();
    }

    let config = PreprocessorConfig::builder()
        .include_text(false)
        .build()
        .unwrap();
    let fitted = Preprocessor::builder()
        .config(config)
        .build()
        .unwrap()
        .fit(&df)
        .unwrap();

    assert!(
        fitted
            .output_columns()
            .iter()
            .all(|c| !c.ends_with("_DESCRIPTION"))
    );
    let out = fitted.transform(&df).unwrap();
    assert_eq!(column_names(&out), fitted.output_columns().to_vec());
}

// ============================================================================
// Cleaning
// ============================================================================

#[test]
fn test_field_values_are_canonical_after_transform() {
    let config = PreprocessorConfig::builder()
        .rare_enabled(false)
        .build()
        .unwrap();
    let fitted = fit(config);
    let out = fitted.transform(&load_sample()).unwrap();

    let age = strings(&out, "CONSTRUCTION_AGE_BAND");
    assert_eq!(
        &age[..10],
        &[
            Some("1900-1929".to_string()),
            Some("1930-1949".to_string()),
            Some("1900-1929".to_string()),
            Some("2007 onwards".to_string()),
            None,
            Some("1967-1975".to_string()),
            Some("1967-1975".to_string()),
            Some("before 1900".to_string()),
            None,
            Some("1983-1990".to_string()),
        ]
    );

    let floor = strings(&out, "FLOOR_LEVEL");
    assert_eq!(
        &floor[..10],
        &[
            Some("0".to_string()),
            Some("1st".to_string()),
            Some("2nd".to_string()),
            Some("basement".to_string()),
            None,
            Some("above 20th".to_string()),
            Some("mid floor".to_string()),
            Some("0".to_string()),
            Some("3rd".to_string()),
            Some("1st".to_string()),
        ]
    );

    let controls = strings(&out, "MAIN_HEATING_CONTROLS");
    assert_eq!(controls[0], Some("2106".to_string()));
    assert_eq!(controls[4], None);

    // sentinel prefixes in text columns
    let walls = strings(&out, "WALLS_DESCRIPTION");
    assert_eq!(walls[3], None);
    assert_eq!(walls[0], Some("Cavity wall as built insulated".to_string()));
}

// ============================================================================
// Rare categories
// ============================================================================

#[test]
fn test_rare_property_types_are_collapsed() {
    let config = PreprocessorConfig::builder()
        .rare_threshold(RareThreshold::Count(10))
        .rare_encoded_value("Other")
        .build()
        .unwrap();
    let fitted = fit(config);
    let rare = fitted.rare_reducer().unwrap();

    assert!(rare.columns().contains(&"PROPERTY_TYPE"));
    assert!(!rare.columns().contains(&"TOTAL_FLOOR_AREA"));
    assert_eq!(rare.rare_values("PROPERTY_TYPE"), vec!["Bungalow", "Park home"]);

    let out = fitted.transform(&load_sample()).unwrap();
    let property = strings(&out, "PROPERTY_TYPE");
    assert_eq!(property[0], Some("House".to_string()));
    assert_eq!(property[8], Some("Other".to_string()));
    assert_eq!(property[17], Some("Other".to_string()));
}

#[test]
fn test_unseen_category_is_collapsed_at_transform() {
    let config = PreprocessorConfig::builder()
        .rare_threshold(RareThreshold::Frequency(0.05))
        .build()
        .unwrap();
    let fitted = fit(config);

    let mut df = load_sample().head(Some(3));
    df.replace(
        "PROPERTY_TYPE",
        Series::new("PROPERTY_TYPE".into(), &["House", "Castle", "Flat"]),
    )
    .unwrap();
    let out = fitted.transform(&df).unwrap();

    assert_eq!(
        strings(&out, "PROPERTY_TYPE"),
        vec![Some("House".to_string()), None, Some("Flat".to_string())]
    );
}

// ============================================================================
// Imputation
// ============================================================================

#[test]
fn test_room_counts_are_imputed() {
    let fitted = fit(PreprocessorConfig::default());
    let original = load_sample();
    let out = fitted.transform(&original).unwrap();

    let before = floats(&original, "NUMBER_HABITABLE_ROOMS");
    let after = floats(&out, "NUMBER_HABITABLE_ROOMS");

    for (i, (b, a)) in before.iter().zip(&after).enumerate() {
        match (b, i) {
            (Some(b), _) => assert_eq!(a, &Some(*b), "row {i} changed"),
            // no floor area either
            (None, 30) => assert_eq!(a, &None),
            (None, _) => {
                let value = a.expect("imputed value");
                assert!(value >= 1.0);
                assert_eq!(value, value.round());
            }
        }
    }

    assert!(floats(&out, "NUMBER_HEATED_ROOMS")[5].is_some());
    assert!(floats(&out, "FIXED_LIGHTING_OUTLETS_COUNT")[8].is_some());
    assert_eq!(floats(&out, "FIXED_LIGHTING_OUTLETS_COUNT")[30], None);

    let model = fitted
        .imputer()
        .unwrap()
        .model("NUMBER_HABITABLE_ROOMS")
        .unwrap();
    assert_eq!(model.diagnostics().n_samples, 37);
}

#[test]
fn test_imputation_is_deterministic() {
    let a = fit(PreprocessorConfig::default());
    let b = fit(PreprocessorConfig::default());
    let df = load_sample();
    assert!(a.transform(&df).unwrap().equals_missing(&b.transform(&df).unwrap()));
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_saved_state_replays_identically() {
    let fitted = fit(PreprocessorConfig::default());
    let path = std::env::temp_dir().join(format!("epc-state-{}.json", std::process::id()));
    fitted.save(&path).unwrap();

    let loaded = FittedPreprocessor::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.metadata(), fitted.metadata());
    let df = load_sample();
    assert!(
        loaded
            .transform(&df)
            .unwrap()
            .equals_missing(&fitted.transform(&df).unwrap())
    );
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "feature": {
            "columns": {
                "numeric": ["TOTAL_FLOOR_AREA", "NUMBER_HABITABLE_ROOMS", "NUMBER_HEATED_ROOMS", "FIXED_LIGHTING_OUTLETS_COUNT"],
                "categorical": ["PROPERTY_TYPE", "BUILT_FORM"],
                "text": [],
                "redundant": []
            },
            "fields": {
                "age_band": "CONSTRUCTION_AGE_BAND",
                "floor_level": "FLOOR_LEVEL",
                "heating_controls": "MAIN_HEATING_CONTROLS"
            },
            "include_text": false,
            "missing_threshold": 0.5
        },
        "rare": {"enabled": true, "threshold": 0.1, "encoded_value": "Other"}
    }"#;
    let config: PreprocessorConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.rare.threshold, RareThreshold::Frequency(0.1));

    let fitted = fit(config);
    assert_eq!(
        fitted.output_columns().to_vec(),
        vec![
            "TOTAL_FLOOR_AREA",
            "NUMBER_HABITABLE_ROOMS",
            "NUMBER_HEATED_ROOMS",
            "FIXED_LIGHTING_OUTLETS_COUNT",
            "PROPERTY_TYPE",
            "BUILT_FORM",
        ]
    );
    assert!(fitted.imputer().is_some());
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_fitted_state_shared_across_threads() {
    let fitted = Arc::new(fit(PreprocessorConfig::default()));
    let df = Arc::new(load_sample());
    let expected = fitted.transform(&df).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let fitted = Arc::clone(&fitted);
            let df = Arc::clone(&df);
            std::thread::spawn(move || fitted.transform(&df).unwrap())
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().equals_missing(&expected));
    }
}
