use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::ids::{ApiId, ModelId, UsageEventId};
use super::model::ArtifactRef;
use super::task::TaskType;

// ===== Usage Metrics =====

/// Rolling usage aggregate of one generated API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_cpu_time_ms: f64,
    pub total_memory_mb: f64,
    pub total_response_time_ms: f64,
    pub average_response_time_ms: f64,
}

impl ApiMetrics {
    /// Fold one event into the aggregate. The average is maintained
    /// incrementally: `avg += (sample - avg) / count`.
    pub fn apply(&mut self, event: &UsageEvent) {
        self.total_requests += 1;
        if event.success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
        self.total_cpu_time_ms += event.cpu_time_ms;
        self.total_memory_mb += event.memory_mb;
        self.total_response_time_ms += event.response_time_ms;
        self.average_response_time_ms +=
            (event.response_time_ms - self.average_response_time_ms) / self.total_requests as f64;
    }

    pub fn success_rate(&self) -> Option<f64> {
        if self.total_requests == 0 {
            None
        } else {
            Some(self.successful_requests as f64 / self.total_requests as f64)
        }
    }
}

/// One logged invocation of a generated API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageEvent {
    pub id: UsageEventId,
    pub api_id: ApiId,
    pub success: bool,
    pub response_time_ms: f64,
    pub cpu_time_ms: f64,
    pub memory_mb: f64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UsageEvent {
    pub fn success(api_id: ApiId, response_time_ms: f64, cpu_time_ms: f64, memory_mb: f64) -> Self {
        Self {
            id: UsageEventId::new(),
            api_id,
            success: true,
            response_time_ms,
            cpu_time_ms,
            memory_mb,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn failure(
        api_id: ApiId,
        response_time_ms: f64,
        cpu_time_ms: f64,
        memory_mb: f64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: UsageEventId::new(),
            api_id,
            success: false,
            response_time_ms,
            cpu_time_ms,
            memory_mb,
            error_message: Some(error.into()),
            created_at: Utc::now(),
        }
    }
}

// ===== Generated API =====

/// A served prediction endpoint pinned to one artifact version.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GeneratedApi {
    pub id: ApiId,
    pub model_id: ModelId,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    pub task: TaskType,
    pub artifact: ArtifactRef,
    pub feature_columns: Vec<String>,
    pub target_column: String,
    pub created_at: DateTime<Utc>,
    pub metrics: ApiMetrics,
}

impl GeneratedApi {
    pub fn new(
        model_id: ModelId,
        name: String,
        description: Option<String>,
        task: TaskType,
        artifact: ArtifactRef,
        feature_columns: Vec<String>,
        target_column: String,
    ) -> Self {
        Self {
            id: ApiId::new(),
            model_id,
            name,
            description,
            task,
            artifact,
            feature_columns,
            target_column,
            created_at: Utc::now(),
            metrics: ApiMetrics::default(),
        }
    }

    /// Human-readable version tag, e.g. `v3`.
    pub fn version(&self) -> String {
        format!("v{}", self.artifact.version)
    }
}

// ===== Dashboard =====

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardMetrics {
    pub total_models: u64,
    pub total_apis: u64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_cpu_time_ms: f64,
    pub total_memory_mb: f64,
    pub total_response_time_ms: f64,
    pub average_response_time_ms: f64,
}
