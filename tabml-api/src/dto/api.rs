use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabml_core::{Algorithm, ApiMetrics, GeneratedApi, TaskType};
use tabml_workflow::CreateApiRequest;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateApiBody {
    pub model_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    /// Pin a specific candidate from the latest run instead of the best one.
    pub algorithm: Option<Algorithm>,
}

impl From<CreateApiBody> for CreateApiRequest {
    fn from(body: CreateApiBody) -> Self {
        Self {
            model_id: body.model_id.into(),
            name: body.name,
            description: body.description,
            algorithm: body.algorithm,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub id: Uuid,
    pub model_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub task: TaskType,
    pub algorithm: Algorithm,
    pub version: String,
    pub endpoint: String,
    pub feature_columns: Vec<String>,
    pub target_column: String,
    pub created_at: DateTime<Utc>,
    pub metrics: ApiMetrics,
    pub success_rate: Option<f64>,
}

impl From<GeneratedApi> for ApiResponse {
    fn from(api: GeneratedApi) -> Self {
        Self {
            id: api.id.0,
            model_id: api.model_id.0,
            version: api.version(),
            endpoint: format!("/apis/{}/predict", api.id),
            algorithm: api.artifact.algorithm,
            success_rate: api.metrics.success_rate(),
            name: api.name,
            description: api.description,
            task: api.task,
            feature_columns: api.feature_columns,
            target_column: api.target_column,
            created_at: api.created_at,
            metrics: api.metrics,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UsageQuery {
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<usize>,
}
