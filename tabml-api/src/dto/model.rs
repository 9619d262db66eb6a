use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabml_core::{Algorithm, Model, TaskType};
use tabml_workflow::TrainingRequest;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateModelRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub task: Option<TaskType>,
    pub target_column: Option<String>,
    pub feature_columns: Vec<String>,
    pub dataset_ref: Option<String>,
    pub best_algorithm: Option<Algorithm>,
    pub best_version: Option<u64>,
    pub trained: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for ModelResponse {
    fn from(model: Model) -> Self {
        Self {
            id: model.id.0,
            trained: model.is_trained(),
            best_version: model.best_artifact.as_ref().map(|a| a.version),
            name: model.name,
            description: model.description,
            task: model.task,
            target_column: model.target_column,
            feature_columns: model.feature_columns,
            dataset_ref: model.dataset_ref,
            best_algorithm: model.best_algorithm,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub dataset_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    pub target: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_train_request"))]
pub struct TrainRequest {
    pub task: TaskType,
    #[validate(length(min = 1, max = 255))]
    pub target_column: String,
    #[validate(length(min = 1))]
    pub feature_columns: Vec<String>,
}

fn validate_train_request(request: &TrainRequest) -> Result<(), ValidationError> {
    if request.feature_columns.iter().any(|c| c == &request.target_column) {
        return Err(ValidationError::new("target_in_features"));
    }
    Ok(())
}

impl From<TrainRequest> for TrainingRequest {
    fn from(request: TrainRequest) -> Self {
        Self {
            task: request.task,
            target_column: request.target_column,
            feature_columns: request.feature_columns,
        }
    }
}
