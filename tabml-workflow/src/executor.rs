use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tabml_core::{CoreError, Dataset, ModelId, Result};
use tokio::sync::{broadcast, Semaphore};

use crate::engine::{TrainingEngine, TrainingOutcome, TrainingRequest};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStage {
    Queued,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingProgress {
    pub model_id: ModelId,
    pub stage: TrainingStage,
    pub message: Option<String>,
}

/// Runs training on blocking worker threads, at most `max_concurrent_runs`
/// at a time. Runs for different models proceed in parallel; each owns its
/// dataset and writes under its own model's artifact directory.
#[derive(Clone)]
pub struct TrainingExecutor {
    engine: Arc<TrainingEngine>,
    permits: Arc<Semaphore>,
    progress_tx: broadcast::Sender<TrainingProgress>,
}

impl TrainingExecutor {
    pub fn new(engine: Arc<TrainingEngine>, max_concurrent_runs: usize) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            engine,
            permits: Arc::new(Semaphore::new(max_concurrent_runs.max(1))),
            progress_tx,
        }
    }

    /// Receive progress for every run submitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<TrainingProgress> {
        self.progress_tx.subscribe()
    }

    fn report(&self, model_id: ModelId, stage: TrainingStage, message: Option<String>) {
        let _ = self.progress_tx.send(TrainingProgress {
            model_id,
            stage,
            message,
        });
    }

    /// Train and wait for the result.
    pub async fn submit(
        &self,
        model_id: ModelId,
        dataset: Arc<Dataset>,
        request: TrainingRequest,
    ) -> Result<TrainingOutcome> {
        self.report(model_id, TrainingStage::Queued, None);
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| CoreError::Internal("training executor is shut down".to_string()))?;
        self.report(model_id, TrainingStage::Running, None);

        let engine = Arc::clone(&self.engine);
        let result = tokio::task::spawn_blocking(move || engine.train(model_id, &dataset, &request))
            .await
            .map_err(|e| CoreError::Internal(format!("training worker failed: {}", e)))
            .and_then(|result| result);

        match &result {
            Ok(outcome) => self.report(
                model_id,
                TrainingStage::Completed,
                Some(outcome.run.justification.clone()),
            ),
            Err(e) => self.report(model_id, TrainingStage::Failed, Some(e.to_string())),
        }
        result
    }
}
