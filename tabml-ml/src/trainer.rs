use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use ndarray::{Array1, Array2};
use tabml_core::{
    Algorithm, CandidateMetrics, CandidateResult, CoreError, Dataset, MetricCalculator, Result,
    TaskType, TrainingConfig,
};
use tabml_metrics::{
    ClassificationCalculator, ClassificationInput, RegressionCalculator, RegressionInput,
};
use tracing::{debug, warn};

use crate::artifact::ModelArtifact;
use crate::estimators::{self, FitParams, TrainingSet};
use crate::preprocessing::{Preprocessor, TargetEncoder};
use crate::profiler::DatasetProfiler;
use crate::split::{stratified_split, train_test_split};

/// Encoded train/test partitions plus the fitted transforms that produced
/// them.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub task: TaskType,
    pub target_column: String,
    pub feature_columns: Vec<String>,
    pub preprocessor: Preprocessor,
    pub target: TargetEncoder,
    pub x_train: Array2<f64>,
    pub y_train: Array1<f64>,
    pub x_test: Array2<f64>,
    pub y_test: Array1<f64>,
    /// Rows discarded because the target was missing.
    pub dropped_rows: usize,
}

impl PreparedData {
    pub fn train_rows(&self) -> usize {
        self.x_train.nrows()
    }

    pub fn test_rows(&self) -> usize {
        self.x_test.nrows()
    }
}

/// A candidate's evaluation and, when it fit, the artifact to persist.
#[derive(Debug)]
pub struct CandidateOutcome {
    pub result: CandidateResult,
    pub artifact: Option<ModelArtifact>,
}

/// The winner of a run and why it won.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub algorithm: Algorithm,
    pub justification: String,
}

/// Fits, evaluates and ranks the candidate roster for one training request.
#[derive(Debug, Clone)]
pub struct CandidateTrainer {
    config: TrainingConfig,
    params: FitParams,
}

impl CandidateTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        let params = FitParams::from(&config);
        Self { config, params }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Validate the request, split the rows and fit the preprocessing on the
    /// training partition.
    pub fn prepare(
        &self,
        dataset: &Dataset,
        task: TaskType,
        target_column: &str,
        feature_columns: &[String],
    ) -> Result<PreparedData> {
        let profile = DatasetProfiler::new().profile(dataset)?;
        validate_columns(dataset, target_column, feature_columns)?;

        let target = dataset
            .column(target_column)
            .ok_or_else(|| CoreError::Validation(format!("unknown target column '{}'", target_column)))?;
        let usable: Vec<usize> = (0..dataset.row_count())
            .filter(|&row| !target.values[row].is_missing())
            .collect();
        let dropped_rows = dataset.row_count() - usable.len();
        if usable.len() < self.config.min_rows {
            return Err(CoreError::Validation(format!(
                "{} usable rows with a target value; at least {} are required",
                usable.len(),
                self.config.min_rows
            )));
        }
        if dropped_rows > 0 {
            debug!(dropped_rows, target = %target_column, "Dropped rows with a missing target");
        }

        let (target_encoder, y_all) = TargetEncoder::fit_transform(task, dataset, target_column, &usable)?;

        let split = match task {
            TaskType::Classification => {
                let classes: Vec<usize> = y_all.iter().map(|&v| v as usize).collect();
                stratified_split(&classes, self.config.test_fraction, self.config.random_seed)?
            }
            TaskType::Regression => {
                train_test_split(usable.len(), self.config.test_fraction, self.config.random_seed)?
            }
        };

        let train_rows: Vec<usize> = split.train.iter().map(|&i| usable[i]).collect();
        let test_rows: Vec<usize> = split.test.iter().map(|&i| usable[i]).collect();

        let preprocessor = Preprocessor::fit(
            dataset,
            &profile,
            feature_columns,
            &train_rows,
            self.config.max_categories,
        )?;
        let x_train = preprocessor.transform_dataset(dataset, &train_rows)?;
        let x_test = preprocessor.transform_dataset(dataset, &test_rows)?;
        let y_train = split.train.iter().map(|&i| y_all[i]).collect();
        let y_test = split.test.iter().map(|&i| y_all[i]).collect();

        Ok(PreparedData {
            task,
            target_column: target_column.to_string(),
            feature_columns: feature_columns.to_vec(),
            preprocessor,
            target: target_encoder,
            x_train,
            y_train,
            x_test,
            y_test,
            dropped_rows,
        })
    }

    /// Fit and evaluate one algorithm. Failures, including panics inside the
    /// estimator, come back as a failed candidate.
    pub fn fit_candidate(&self, data: &PreparedData, algorithm: Algorithm) -> CandidateOutcome {
        let started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| self.fit_and_evaluate(data, algorithm)))
            .unwrap_or_else(|_| Err(format!("{} panicked during fit", algorithm)));
        let training_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok((metrics, artifact)) => {
                debug!(algorithm = %algorithm, training_time_ms, "Candidate fitted");
                CandidateOutcome {
                    result: CandidateResult {
                        algorithm,
                        metrics: Some(metrics),
                        artifact_path: None,
                        version: None,
                        training_time_ms,
                        error: None,
                    },
                    artifact: Some(artifact),
                }
            }
            Err(error) => {
                warn!(algorithm = %algorithm, error = %error, "Candidate failed to fit");
                CandidateOutcome {
                    result: CandidateResult {
                        algorithm,
                        metrics: None,
                        artifact_path: None,
                        version: None,
                        training_time_ms,
                        error: Some(error),
                    },
                    artifact: None,
                }
            }
        }
    }

    /// Fit every algorithm of the task's roster in roster order.
    pub fn fit_roster(&self, data: &PreparedData) -> Vec<CandidateOutcome> {
        Algorithm::roster(data.task)
            .into_iter()
            .map(|algorithm| self.fit_candidate(data, algorithm))
            .collect()
    }

    fn fit_and_evaluate(
        &self,
        data: &PreparedData,
        algorithm: Algorithm,
    ) -> std::result::Result<(CandidateMetrics, ModelArtifact), String> {
        let training_set = TrainingSet::new(&data.x_train, &data.y_train, data.target.n_classes());
        let estimator = estimators::fit(algorithm, &training_set, &self.params).map_err(|e| e.to_string())?;
        let predicted = estimator.predict(&data.x_test).map_err(|e| e.to_string())?;

        let metrics = evaluate(data, &predicted).map_err(|e| e.to_string())?;
        let artifact = ModelArtifact::new(
            data.task,
            data.target_column.clone(),
            data.preprocessor.clone(),
            data.target.clone(),
            estimator,
        );
        Ok((metrics, artifact))
    }
}

/// Score test-set predictions with the task's metric set.
pub fn evaluate(data: &PreparedData, predicted: &Array1<f64>) -> Result<CandidateMetrics> {
    match &data.target {
        TargetEncoder::Labels { classes } => {
            let clamp = |v: f64| (v.round().max(0.0) as usize).min(classes.len() - 1);
            let input = ClassificationInput::new(
                classes.clone(),
                data.y_test.iter().map(|&v| clamp(v)).collect(),
                predicted.iter().map(|&v| clamp(v)).collect(),
            );
            ClassificationCalculator::new()
                .calculate(&input)
                .map(CandidateMetrics::Classification)
        }
        TargetEncoder::Continuous => {
            let input = RegressionInput::new(data.y_test.to_vec(), predicted.to_vec());
            RegressionCalculator::new()
                .calculate(&input)
                .map(CandidateMetrics::Regression)
        }
    }
}

/// Pick the winner among successful candidates.
///
/// Classification ranks by F1, then accuracy, then shortest training time.
/// Regression ranks by R², then lowest MSE, then shortest training time.
/// Remaining ties keep roster order.
pub fn select_best(candidates: &[CandidateResult]) -> Option<Selection> {
    let successful: Vec<&CandidateResult> = candidates.iter().filter(|c| c.succeeded()).collect();
    let mut best: Option<&CandidateResult> = None;
    for &candidate in &successful {
        if best.map_or(true, |b| outranks(candidate, b)) {
            best = Some(candidate);
        }
    }
    let best = best?;

    let justification = match best.metrics.as_ref()? {
        CandidateMetrics::Classification(m) => format!(
            "{} selected with the highest F1 score {:.4} (accuracy {:.4}) among {} successful candidate(s)",
            best.algorithm,
            m.f1,
            m.accuracy,
            successful.len()
        ),
        CandidateMetrics::Regression(m) => format!(
            "{} selected with the highest R² {:.4} (MSE {:.4}) among {} successful candidate(s)",
            best.algorithm,
            m.r2,
            m.mse,
            successful.len()
        ),
    };

    Some(Selection {
        algorithm: best.algorithm,
        justification,
    })
}

fn outranks(a: &CandidateResult, b: &CandidateResult) -> bool {
    use std::cmp::Ordering;

    let primary = match (&a.metrics, &b.metrics) {
        (Some(CandidateMetrics::Classification(x)), Some(CandidateMetrics::Classification(y))) => {
            x.f1.total_cmp(&y.f1).then(x.accuracy.total_cmp(&y.accuracy))
        }
        (Some(CandidateMetrics::Regression(x)), Some(CandidateMetrics::Regression(y))) => {
            x.r2.total_cmp(&y.r2).then(y.mse.total_cmp(&x.mse))
        }
        _ => Ordering::Equal,
    };
    match primary {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => a.training_time_ms < b.training_time_ms,
    }
}

fn validate_columns(dataset: &Dataset, target: &str, features: &[String]) -> Result<()> {
    if features.is_empty() {
        return Err(CoreError::Validation("at least one feature column is required".to_string()));
    }
    if !dataset.has_column(target) {
        return Err(CoreError::Validation(format!("unknown target column '{}'", target)));
    }
    if features.iter().any(|f| f == target) {
        return Err(CoreError::Validation(format!(
            "target column '{}' cannot also be a feature",
            target
        )));
    }
    let mut seen = HashSet::new();
    for feature in features {
        if !dataset.has_column(feature) {
            return Err(CoreError::Validation(format!("unknown feature column '{}'", feature)));
        }
        if !seen.insert(feature.as_str()) {
            return Err(CoreError::Validation(format!("feature column '{}' listed twice", feature)));
        }
    }
    Ok(())
}
