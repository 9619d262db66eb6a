use approx::assert_relative_eq;
use pretty_assertions::assert_eq;
use rstest::rstest;
use tabml_core::{CoreError, MetricCalculator};
use tabml_metrics::calculators::*;
use tabml_metrics::statistical::SummaryStatistics;

fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ===== Classification =====

#[test]
fn test_perfect_classification() {
    let input = ClassificationInput::new(labels(&["no", "yes"]), vec![0, 1, 1, 0], vec![0, 1, 1, 0]);
    let metrics = ClassificationCalculator::new().calculate(&input).unwrap();

    assert_relative_eq!(metrics.accuracy, 1.0);
    assert_relative_eq!(metrics.precision, 1.0);
    assert_relative_eq!(metrics.recall, 1.0);
    assert_relative_eq!(metrics.f1, 1.0);
    assert_eq!(metrics.confusion_matrix.matrix, vec![vec![2, 0], vec![0, 2]]);
}

#[test]
fn test_binary_macro_metrics() {
    // actual:    no no no yes yes
    // predicted: no no yes yes no
    let input = ClassificationInput::new(
        labels(&["no", "yes"]),
        vec![0, 0, 0, 1, 1],
        vec![0, 0, 1, 1, 0],
    );
    let metrics = ClassificationCalculator::new().calculate(&input).unwrap();

    assert_eq!(metrics.confusion_matrix.shape(), (2, 2));
    assert_eq!(metrics.confusion_matrix.matrix, vec![vec![2, 1], vec![1, 1]]);
    assert_relative_eq!(metrics.accuracy, 0.6);
    // no: p=2/3 r=2/3, yes: p=1/2 r=1/2
    assert_relative_eq!(metrics.precision, (2.0 / 3.0 + 0.5) / 2.0, epsilon = 1e-12);
    assert_relative_eq!(metrics.recall, (2.0 / 3.0 + 0.5) / 2.0, epsilon = 1e-12);
    assert_relative_eq!(metrics.f1, (2.0 / 3.0 + 0.5) / 2.0, epsilon = 1e-12);
}

#[test]
fn test_class_never_predicted_scores_zero_precision() {
    let input = ClassificationInput::new(labels(&["a", "b"]), vec![0, 1, 1], vec![0, 0, 0]);
    let metrics = ClassificationCalculator::new().calculate(&input).unwrap();

    // a: p=1/3 r=1, b: p=0 r=0
    assert_relative_eq!(metrics.precision, (1.0 / 3.0) / 2.0, epsilon = 1e-12);
    assert_relative_eq!(metrics.recall, 0.5, epsilon = 1e-12);
    assert_relative_eq!(metrics.f1, 0.25, epsilon = 1e-12);
}

#[test]
fn test_absent_class_keeps_matrix_row_but_not_average() {
    let input = ClassificationInput::new(labels(&["a", "b", "c"]), vec![0, 1], vec![0, 1]);
    let metrics = ClassificationCalculator::new().calculate(&input).unwrap();

    assert_eq!(metrics.confusion_matrix.shape(), (3, 3));
    assert_relative_eq!(metrics.f1, 1.0);
}

#[rstest]
#[case(vec![0, 1], vec![0])]
#[case(vec![], vec![])]
#[case(vec![0, 2], vec![0, 1])]
fn test_classification_rejects_bad_input(#[case] actual: Vec<usize>, #[case] predicted: Vec<usize>) {
    let input = ClassificationInput::new(labels(&["a", "b"]), actual, predicted);
    assert!(matches!(
        ClassificationCalculator::new().calculate(&input),
        Err(CoreError::Validation(_))
    ));
}

// ===== Regression =====

#[test]
fn test_regression_metrics() {
    let input = RegressionInput::new(vec![3.0, -0.5, 2.0, 7.0], vec![2.5, 0.0, 2.0, 8.0]);
    let metrics = RegressionCalculator::new().calculate(&input).unwrap();

    assert_relative_eq!(metrics.mse, 0.375, epsilon = 1e-12);
    assert_relative_eq!(metrics.mae, 0.5, epsilon = 1e-12);
    assert_relative_eq!(metrics.r2, 0.948_608_137_044_967_9, epsilon = 1e-9);
}

#[test]
fn test_r2_never_exceeds_one() {
    let input = RegressionInput::new(vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0]);
    let metrics = RegressionCalculator::new().calculate(&input).unwrap();
    assert_relative_eq!(metrics.r2, 1.0);

    let bad = RegressionInput::new(vec![1.0, 2.0, 3.0], vec![10.0, -4.0, 0.0]);
    assert!(RegressionCalculator::new().calculate(&bad).unwrap().r2 < 0.0);
}

#[test]
fn test_r2_with_constant_target_is_finite() {
    let exact = RegressionInput::new(vec![5.0, 5.0], vec![5.0, 5.0]);
    assert_relative_eq!(RegressionCalculator::new().calculate(&exact).unwrap().r2, 1.0);

    let off = RegressionInput::new(vec![5.0, 5.0], vec![4.0, 6.0]);
    assert_relative_eq!(RegressionCalculator::new().calculate(&off).unwrap().r2, 0.0);
}

#[test]
fn test_regression_rejects_non_finite() {
    let input = RegressionInput::new(vec![1.0, f64::NAN], vec![1.0, 2.0]);
    assert!(RegressionCalculator::new().calculate(&input).is_err());
}

// ===== Summary statistics =====

#[test]
fn test_numeric_summary() {
    let summary = SummaryStatistics::numeric(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();

    assert_relative_eq!(summary.min, 2.0);
    assert_relative_eq!(summary.max, 9.0);
    assert_relative_eq!(summary.mean, 5.0);
    assert_relative_eq!(summary.std_dev, (32.0_f64 / 7.0).sqrt(), epsilon = 1e-12);
    assert!(summary.integral);
    assert!(!SummaryStatistics::numeric(&[1.0, 2.5]).unwrap().integral);
}

#[test]
fn test_numeric_summary_edge_cases() {
    assert!(SummaryStatistics::numeric(&[]).is_none());
    assert!(SummaryStatistics::numeric(&[f64::NAN]).is_none());

    let single = SummaryStatistics::numeric(&[3.0]).unwrap();
    assert_eq!(single.std_dev, 0.0);
}

#[test]
fn test_mode_prefers_first_on_ties() {
    assert_eq!(SummaryStatistics::mode(["b", "a", "a", "b", "c"]), Some("b"));
    assert_eq!(SummaryStatistics::mode(["x", "y", "y"]), Some("y"));
    assert_eq!(SummaryStatistics::mode(std::iter::empty()), None);
}

#[test]
fn test_mode_over_unique_high_cardinality_column() {
    let values: Vec<String> = (0..200_000).map(|i| format!("cust-{}", i)).collect();
    assert_eq!(SummaryStatistics::mode(values.iter().map(String::as_str)), Some("cust-0"));

    let mut repeated = values.clone();
    repeated.push("cust-199999".to_string());
    assert_eq!(
        SummaryStatistics::mode(repeated.iter().map(String::as_str)),
        Some("cust-199999")
    );
}

#[test]
fn test_frequencies_rank_by_count_then_first_seen() {
    let ranked = SummaryStatistics::frequencies(["c", "a", "b", "a", "b", "d"]);
    assert_eq!(ranked, vec![("a", 2), ("b", 2), ("c", 1), ("d", 1)]);
}
