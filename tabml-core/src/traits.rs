use async_trait::async_trait;

use crate::domain::{
    ApiId, ApiMetrics, GeneratedApi, ModelId, TrainingRun, TrainingRunId, UsageEvent,
};
use crate::error::Result;

#[async_trait]
pub trait Repository<T, ID>: Send + Sync {
    async fn find_by_id(&self, id: &ID) -> Result<Option<T>>;
    /// Insert or replace the entity, returning the stored copy.
    async fn save(&self, entity: &T) -> Result<T>;
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<T>>;
    async fn count(&self) -> Result<u64>;
}

#[async_trait]
pub trait TrainingRunRepository: Repository<TrainingRun, TrainingRunId> {
    async fn latest_for_model(&self, model_id: &ModelId) -> Result<Option<TrainingRun>>;
}

#[async_trait]
pub trait ApiRepository: Repository<GeneratedApi, ApiId> {
    async fn find_by_name(&self, name: &str) -> Result<Option<GeneratedApi>>;
    async fn list_for_model(&self, model_id: &ModelId) -> Result<Vec<GeneratedApi>>;
}

/// Append-only log of API invocations that owns each API's rolling metrics.
///
/// `record` appends the event and folds it into the aggregate as one atomic
/// unit; `aggregate` never observes a half-applied event.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Start tracking an API. Idempotent.
    async fn open(&self, api_id: &ApiId) -> Result<()>;
    async fn record(&self, event: UsageEvent) -> Result<ApiMetrics>;
    async fn aggregate(&self, api_id: &ApiId) -> Result<ApiMetrics>;
    async fn all_aggregates(&self) -> Result<Vec<(ApiId, ApiMetrics)>>;
    /// Most recent events first.
    async fn events(&self, api_id: &ApiId, limit: usize) -> Result<Vec<UsageEvent>>;
}

pub trait MetricCalculator {
    type Input;
    type Output;

    fn calculate(&self, input: &Self::Input) -> Result<Self::Output>;
}
