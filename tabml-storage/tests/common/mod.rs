#![allow(dead_code)]

use tabml_core::{Algorithm, Column, Dataset, Scalar, TaskType, TrainingConfig};
use tabml_ml::artifact::ModelArtifact;
use tabml_ml::trainer::CandidateTrainer;

/// 40 rows of `y = 2x + 1` with a categorical passenger column.
pub fn small_regression_dataset() -> Dataset {
    let n = 40;
    let x: Vec<Scalar> = (0..n).map(|i| Scalar::Number(i as f64)).collect();
    let kind: Vec<Scalar> = (0..n).map(|i| Scalar::from(["a", "b"][i % 2])).collect();
    let y: Vec<Scalar> = (0..n).map(|i| Scalar::Number(2.0 * i as f64 + 1.0)).collect();
    Dataset::new(vec![
        Column::new("x", x),
        Column::new("kind", kind),
        Column::new("y", y),
    ])
}

pub fn trained_artifact(algorithm: Algorithm) -> ModelArtifact {
    let dataset = small_regression_dataset();
    let trainer = CandidateTrainer::new(TrainingConfig::default());
    let data = trainer
        .prepare(
            &dataset,
            TaskType::Regression,
            "y",
            &["x".to_string(), "kind".to_string()],
        )
        .unwrap();
    trainer
        .fit_candidate(&data, algorithm)
        .artifact
        .expect("candidate should fit")
}
