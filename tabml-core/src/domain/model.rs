use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::ids::ModelId;
use super::task::{Algorithm, TaskType};

/// Pointer to a persisted artifact inside the model registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactRef {
    pub model_id: ModelId,
    pub algorithm: Algorithm,
    pub version: u64,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Model {
    pub id: ModelId,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    pub task: Option<TaskType>,
    pub target_column: Option<String>,
    pub feature_columns: Vec<String>,
    /// File reference handed over by the upload layer.
    pub dataset_ref: Option<String>,
    pub best_algorithm: Option<Algorithm>,
    pub best_artifact: Option<ArtifactRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn new(name: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ModelId::new(),
            name,
            description,
            task: None,
            target_column: None,
            feature_columns: Vec::new(),
            dataset_ref: None,
            best_algorithm: None,
            best_artifact: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.best_artifact.is_some()
    }

    /// Record the outcome of a completed training run.
    pub fn record_training(
        &mut self,
        task: TaskType,
        target_column: String,
        feature_columns: Vec<String>,
        best: ArtifactRef,
    ) {
        self.task = Some(task);
        self.target_column = Some(target_column);
        self.feature_columns = feature_columns;
        self.best_algorithm = Some(best.algorithm);
        self.best_artifact = Some(best);
        self.updated_at = Utc::now();
    }
}
