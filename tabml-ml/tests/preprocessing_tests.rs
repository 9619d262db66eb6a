mod common;

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;
use tabml_core::{Column, CoreError, Dataset, Record, Scalar, TaskType};
use tabml_ml::preprocessing::{FeatureEncoder, Preprocessor, TargetEncoder};
use tabml_ml::profiler::DatasetProfiler;

fn dataset() -> Dataset {
    Dataset::new(vec![
        Column::new(
            "size",
            vec![1.0.into(), 3.0.into(), Scalar::Null, 100.0.into()],
        ),
        Column::new(
            "color",
            vec!["red".into(), "blue".into(), "red".into(), "green".into()],
        ),
    ])
}

fn fitted(train: &[usize]) -> Preprocessor {
    let dataset = dataset();
    let profile = DatasetProfiler::new().profile(&dataset).unwrap();
    Preprocessor::fit(&dataset, &profile, &common::names(&["size", "color"]), train, 50).unwrap()
}

fn record(pairs: &[(&str, Scalar)]) -> Record {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[test]
fn test_fit_uses_training_rows_only() {
    let preprocessor = fitted(&[0, 1, 2]);

    match &preprocessor.features[0].encoder {
        FeatureEncoder::Numeric { mean, scale } => {
            assert_relative_eq!(*mean, 2.0);
            // values after imputation: 1, 3, 2
            assert_relative_eq!(*scale, (2.0_f64 / 3.0).sqrt(), epsilon = 1e-12);
        }
        other => panic!("unexpected encoder {:?}", other),
    }
    match &preprocessor.features[1].encoder {
        FeatureEncoder::Categorical {
            categories,
            mode,
            other,
        } => {
            assert_eq!(categories, &vec!["blue".to_string(), "red".to_string()]);
            assert_eq!(mode, "red");
            assert!(!other);
        }
        other => panic!("unexpected encoder {:?}", other),
    }
    assert_eq!(preprocessor.output_width(), 3);
}

#[test]
fn test_transform_records_imputes_and_ignores_unknown_categories() {
    let preprocessor = fitted(&[0, 1, 2]);
    let x = preprocessor
        .transform_records(&[
            record(&[("size", Scalar::Null), ("color", Scalar::Null)]),
            record(&[("size", "3".into()), ("color", "purple".into())]),
        ])
        .unwrap();

    // missing size imputes to the mean, missing color to the mode
    assert_relative_eq!(x[[0, 0]], 0.0);
    assert_eq!(&x.row(0).to_vec()[1..], &[0.0, 1.0]);
    // unseen category encodes as all zeros
    assert_eq!(&x.row(1).to_vec()[1..], &[0.0, 0.0]);
}

#[test]
fn test_transform_records_requires_exact_schema() {
    let preprocessor = fitted(&[0, 1, 2]);

    let missing = preprocessor.transform_records(&[record(&[("size", 1.0.into())])]);
    assert!(matches!(missing, Err(CoreError::SchemaMismatch(_))));

    let extra = preprocessor.transform_records(&[record(&[
        ("size", 1.0.into()),
        ("color", "red".into()),
        ("weight", 2.0.into()),
    ])]);
    assert!(matches!(extra, Err(CoreError::SchemaMismatch(_))));
}

#[test]
fn test_transform_records_rejects_non_numeric_value() {
    let preprocessor = fitted(&[0, 1, 2]);
    let result = preprocessor.transform_records(&[record(&[
        ("size", "large".into()),
        ("color", "red".into()),
    ])]);

    match result {
        Err(CoreError::InvalidFeatureValue { key, value }) => {
            assert_eq!(key, "size");
            assert_eq!(value, "large");
        }
        other => panic!("expected InvalidFeatureValue, got {:?}", other),
    }

    let result = preprocessor.transform_records(&[record(&[
        ("size", Scalar::Bool(true)),
        ("color", "red".into()),
    ])]);
    match result {
        Err(CoreError::InvalidFeatureValue { key, value }) => {
            assert_eq!(key, "size");
            assert_eq!(value, "true");
        }
        other => panic!("expected InvalidFeatureValue, got {:?}", other),
    }
}

#[test]
fn test_high_cardinality_column_keeps_top_levels_and_other_bucket() {
    let mut ids: Vec<Scalar> = (0..3000).map(|i| format!("cust-{}", i).into()).collect();
    // two repeated levels outrank the unique ids
    for row in 0..6 {
        ids[row] = if row % 2 == 0 { "vip".into() } else { "staff".into() };
    }
    let dataset = Dataset::new(vec![
        Column::new("customer", ids),
        Column::new("spend", (0..3000).map(|i| (i as f64).into()).collect()),
    ]);
    let profile = DatasetProfiler::new().profile(&dataset).unwrap();
    let rows: Vec<usize> = (0..3000).collect();

    let preprocessor =
        Preprocessor::fit(&dataset, &profile, &common::names(&["customer", "spend"]), &rows, 4).unwrap();

    match &preprocessor.features[0].encoder {
        FeatureEncoder::Categorical {
            categories,
            mode,
            other,
        } => {
            assert_eq!(categories.len(), 4);
            assert!(categories.contains(&"vip".to_string()));
            assert!(categories.contains(&"staff".to_string()));
            assert_eq!(mode, "vip");
            assert!(other);
        }
        other => panic!("unexpected encoder {:?}", other),
    }
    assert_eq!(preprocessor.output_width(), 6);

    let x = preprocessor.transform_dataset(&dataset, &rows).unwrap();
    assert_eq!(x.dim(), (3000, 6));
    for row in x.rows() {
        assert_relative_eq!(row.iter().take(5).sum::<f64>(), 1.0);
    }

    let unseen = preprocessor
        .transform_records(&[record(&[("customer", "cust-99999".into()), ("spend", 1.0.into())])])
        .unwrap();
    assert_relative_eq!(unseen[[0, 4]], 1.0);
    assert_relative_eq!(unseen.row(0).iter().take(4).sum::<f64>(), 0.0);
}

#[test]
fn test_target_encoder_sorts_labels_and_decodes() {
    let dataset = common::yes_no_dataset();
    let rows: Vec<usize> = (0..dataset.row_count()).collect();
    let (encoder, y) =
        TargetEncoder::fit_transform(TaskType::Classification, &dataset, "label", &rows).unwrap();

    assert_eq!(encoder.classes(), &["no".to_string(), "yes".to_string()]);
    assert!(y.iter().all(|&v| v == 0.0 || v == 1.0));
    assert_eq!(encoder.decode(1.0), Scalar::Text("yes".to_string()));
}

#[test]
fn test_regression_target_must_be_numeric() {
    let dataset = common::yes_no_dataset();
    let rows: Vec<usize> = (0..dataset.row_count()).collect();
    assert!(matches!(
        TargetEncoder::fit_transform(TaskType::Regression, &dataset, "label", &rows),
        Err(CoreError::Validation(_))
    ));
}
