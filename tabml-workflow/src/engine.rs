use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tabml_core::{
    Algorithm, ArtifactRef, CoreError, Dataset, ModelId, Result, TaskType, TrainingConfig,
    TrainingRun, TrainingRunId,
};
use tabml_ml::trainer::{select_best, CandidateTrainer};
use tabml_storage::ArtifactRegistry;
use tracing::{info, warn};

/// What to train: the explicit task and column choices for one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingRequest {
    pub task: TaskType,
    pub target_column: String,
    pub feature_columns: Vec<String>,
}

/// A completed run and the artifact that won it.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub run: TrainingRun,
    pub best: ArtifactRef,
}

/// Runs the full training pipeline for one model: split, preprocess, fit the
/// roster, evaluate, publish every fitted candidate and pick the winner.
///
/// `train` is CPU-bound and blocking; async callers go through
/// [`TrainingExecutor`](crate::executor::TrainingExecutor).
pub struct TrainingEngine {
    trainer: CandidateTrainer,
    registry: Arc<ArtifactRegistry>,
}

impl TrainingEngine {
    pub fn new(config: TrainingConfig, registry: Arc<ArtifactRegistry>) -> Self {
        Self {
            trainer: CandidateTrainer::new(config),
            registry,
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        self.trainer.config()
    }

    pub fn train(
        &self,
        model_id: ModelId,
        dataset: &Dataset,
        request: &TrainingRequest,
    ) -> Result<TrainingOutcome> {
        let task = request.task;
        info!(
            model_id = %model_id,
            task = %task,
            target = %request.target_column,
            features = request.feature_columns.len(),
            "Training run started"
        );

        let result = self.run(model_id, dataset, request);
        let outcome = match &result {
            Ok(_) => "succeeded",
            Err(CoreError::AllCandidatesFailed(_)) => "all_failed",
            Err(_) => "rejected",
        };
        metrics::counter!("tabml_training_runs_total", "task" => task.as_str(), "outcome" => outcome)
            .increment(1);
        result
    }

    fn run(&self, model_id: ModelId, dataset: &Dataset, request: &TrainingRequest) -> Result<TrainingOutcome> {
        let data = self.trainer.prepare(
            dataset,
            request.task,
            &request.target_column,
            &request.feature_columns,
        )?;

        let mut outcomes = Vec::new();
        for algorithm in Algorithm::roster(request.task) {
            let outcome = self.trainer.fit_candidate(&data, algorithm);
            metrics::histogram!("tabml_candidate_fit_seconds", "algorithm" => algorithm.as_str())
                .record(outcome.result.training_time_ms / 1000.0);
            outcomes.push(outcome);
        }

        if outcomes.iter().all(|o| o.artifact.is_none()) {
            let reasons: Vec<String> = outcomes
                .iter()
                .map(|o| {
                    format!(
                        "{}: {}",
                        o.result.algorithm,
                        o.result.error.as_deref().unwrap_or("unknown error")
                    )
                })
                .collect();
            warn!(model_id = %model_id, "Every candidate failed to fit");
            return Err(CoreError::AllCandidatesFailed(reasons.join("; ")));
        }

        let version = self.registry.allocate_version(&model_id)?;
        let mut candidates = Vec::with_capacity(outcomes.len());
        let mut published = Vec::new();
        for outcome in outcomes {
            let mut result = outcome.result;
            if let Some(artifact) = outcome.artifact {
                let reference = self.registry.save(&model_id, version, &artifact)?;
                result.artifact_path = Some(reference.path.clone());
                result.version = Some(version);
                published.push(reference);
            }
            candidates.push(result);
        }

        let selection = select_best(&candidates).ok_or_else(|| {
            CoreError::AllCandidatesFailed("no candidate produced metrics".to_string())
        })?;
        let best = published
            .into_iter()
            .find(|r| r.algorithm == selection.algorithm)
            .ok_or_else(|| {
                CoreError::Internal(format!("winning candidate {} has no artifact", selection.algorithm))
            })?;

        let run = TrainingRun {
            id: TrainingRunId::new(),
            model_id,
            task: request.task,
            target_column: request.target_column.clone(),
            feature_columns: request.feature_columns.clone(),
            train_rows: data.train_rows(),
            test_rows: data.test_rows(),
            candidates,
            best_algorithm: selection.algorithm,
            justification: selection.justification,
            best_artifact_path: Some(best.path.clone()),
            created_at: Utc::now(),
        };

        info!(
            model_id = %model_id,
            run_id = %run.id,
            best = %run.best_algorithm,
            version,
            "Training run finished"
        );
        Ok(TrainingOutcome { run, best })
    }
}
