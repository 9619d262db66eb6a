use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tabml_core::{
    Algorithm, ApiId, ApiRepository, ArtifactRef, CoreError, DashboardMetrics, Dataset,
    DatasetProfile, GeneratedApi, Model, ModelId, PlatformConfig, Record, Repository, Result,
    MetricCalculator, Scalar, TrainingRun, TrainingRunRepository, UsageEvent, UsageLedger,
};
use tabml_metrics::{LatencyCalculator, UsageAggregator, UsageSummary};
use tabml_ml::profiler::DatasetProfiler;
use tabml_ml::resolver::{TaskAdvice, TaskResolver};
use tabml_storage::{
    ArtifactRegistry, InMemoryApiRepository, InMemoryModelRepository,
    InMemoryTrainingRunRepository, InMemoryUsageLedger, PgApiRepository, PgModelRepository,
    PgTrainingRunRepository, PgUsageLedger,
};
use tokio::sync::{broadcast, Mutex};
use tracing::info;
use validator::Validate;

use crate::engine::{TrainingEngine, TrainingRequest};
use crate::executor::{TrainingExecutor, TrainingProgress};
use crate::gateway::{EndpointGateway, PredictionOutcome};
use crate::serving::PredictionService;

/// Persistence seams the platform runs on.
#[derive(Clone)]
pub struct Stores {
    pub models: Arc<dyn Repository<Model, ModelId>>,
    pub runs: Arc<dyn TrainingRunRepository>,
    pub apis: Arc<dyn ApiRepository>,
    pub ledger: Arc<dyn UsageLedger>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            models: Arc::new(InMemoryModelRepository::new()),
            runs: Arc::new(InMemoryTrainingRunRepository::new()),
            apis: Arc::new(InMemoryApiRepository::new()),
            ledger: Arc::new(InMemoryUsageLedger::new()),
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            models: Arc::new(PgModelRepository::new(pool.clone())),
            runs: Arc::new(PgTrainingRunRepository::new(pool.clone())),
            apis: Arc::new(PgApiRepository::new(pool.clone())),
            ledger: Arc::new(PgUsageLedger::new(pool)),
        }
    }
}

/// Result of analysing an attached dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetAnalysis {
    pub profile: DatasetProfile,
    pub advice: Option<TaskAdvice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApiRequest {
    pub model_id: ModelId,
    pub name: String,
    pub description: Option<String>,
    /// Serve this algorithm from the latest run instead of the model's best.
    pub algorithm: Option<Algorithm>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SinglePrediction {
    pub prediction: Scalar,
    pub response_time_ms: f64,
}

/// Every logical operation of the platform, over whichever stores it was
/// built with.
pub struct Platform {
    config: PlatformConfig,
    stores: Stores,
    datasets: DashMap<ModelId, Arc<Dataset>>,
    executor: TrainingExecutor,
    gateway: EndpointGateway,
    resolver: TaskResolver,
    api_creation: Mutex<()>,
}

impl Platform {
    pub fn new(config: PlatformConfig, stores: Stores) -> Result<Self> {
        config.check()?;

        let registry = Arc::new(ArtifactRegistry::new(&config.storage.artifact_root)?);
        let engine = Arc::new(TrainingEngine::new(config.training.clone(), Arc::clone(&registry)));
        let executor = TrainingExecutor::new(engine, config.training.max_concurrent_runs);
        let service = Arc::new(PredictionService::new(registry, config.serving.clone()));
        let gateway = EndpointGateway::new(service, Arc::clone(&stores.ledger));
        let resolver = TaskResolver::new(config.training.classification_cardinality_threshold);

        Ok(Self {
            config,
            stores,
            datasets: DashMap::new(),
            executor,
            gateway,
            resolver,
            api_creation: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn subscribe_progress(&self) -> broadcast::Receiver<TrainingProgress> {
        self.executor.subscribe()
    }

    // ===== Models =====

    pub async fn create_model(&self, name: String, description: Option<String>) -> Result<Model> {
        let model = Model::new(name, description);
        model
            .validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        let model = self.stores.models.save(&model).await?;
        info!(model_id = %model.id, name = %model.name, "Model created");
        Ok(model)
    }

    pub async fn list_models(&self, limit: usize, offset: usize) -> Result<Vec<Model>> {
        self.stores.models.list(limit, offset).await
    }

    pub async fn get_model(&self, model_id: &ModelId) -> Result<Model> {
        self.stores
            .models
            .find_by_id(model_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("model {}", model_id)))
    }

    /// Hand a parsed dataset to a model. It stays attached until a training
    /// run on it completes.
    pub async fn attach_dataset(
        &self,
        model_id: &ModelId,
        dataset: Dataset,
        dataset_ref: Option<String>,
    ) -> Result<DatasetProfile> {
        let mut model = self.get_model(model_id).await?;
        let profile = DatasetProfiler::new().profile(&dataset)?;

        self.datasets.insert(*model_id, Arc::new(dataset));
        model.dataset_ref = dataset_ref;
        model.updated_at = chrono::Utc::now();
        self.stores.models.save(&model).await?;

        info!(
            model_id = %model_id,
            rows = profile.row_count,
            columns = profile.column_count,
            "Dataset attached"
        );
        Ok(profile)
    }

    fn attached(&self, model_id: &ModelId) -> Result<Arc<Dataset>> {
        self.datasets
            .get(model_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| CoreError::Validation(format!("model {} has no dataset attached", model_id)))
    }

    /// Profile the attached dataset and, when a target is named, advise a task.
    pub async fn analyze(&self, model_id: &ModelId, target: Option<&str>) -> Result<DatasetAnalysis> {
        self.get_model(model_id).await?;
        let dataset = self.attached(model_id)?;
        let profile = DatasetProfiler::new().profile(&dataset)?;

        let advice = match target {
            Some(target) => {
                let column = profile
                    .column(target)
                    .ok_or_else(|| CoreError::Validation(format!("unknown target column '{}'", target)))?;
                Some(self.resolver.resolve(column))
            }
            None => None,
        };
        Ok(DatasetAnalysis { profile, advice })
    }

    // ===== Training =====

    pub async fn train(&self, model_id: &ModelId, request: TrainingRequest) -> Result<TrainingRun> {
        let mut model = self.get_model(model_id).await?;
        let dataset = self.attached(model_id)?;

        let outcome = self.executor.submit(*model_id, dataset, request.clone()).await?;
        let run = self.stores.runs.save(&outcome.run).await?;

        model.record_training(
            request.task,
            request.target_column,
            request.feature_columns,
            outcome.best,
        );
        self.stores.models.save(&model).await?;
        self.datasets.remove(model_id);

        Ok(run)
    }

    pub async fn latest_run(&self, model_id: &ModelId) -> Result<TrainingRun> {
        self.get_model(model_id).await?;
        self.stores
            .runs
            .latest_for_model(model_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("training run for model {}", model_id)))
    }

    // ===== Generated APIs =====

    pub async fn create_api(&self, request: CreateApiRequest) -> Result<GeneratedApi> {
        let model = self.get_model(&request.model_id).await?;
        let (task, target_column) = match (&model.best_artifact, model.task, &model.target_column) {
            (Some(_), Some(task), Some(target)) => (task, target.clone()),
            _ => {
                return Err(CoreError::Validation(format!(
                    "model {} has not been trained",
                    model.id
                )))
            }
        };

        let artifact = match request.algorithm {
            None => model
                .best_artifact
                .clone()
                .ok_or_else(|| CoreError::Validation(format!("model {} has not been trained", model.id)))?,
            Some(algorithm) => self.candidate_artifact(&model.id, algorithm).await?,
        };

        let _guard = self.api_creation.lock().await;
        if self.stores.apis.find_by_name(&request.name).await?.is_some() {
            return Err(CoreError::AlreadyExists(format!("API named '{}'", request.name)));
        }

        let api = GeneratedApi::new(
            model.id,
            request.name,
            request.description,
            task,
            artifact,
            model.feature_columns.clone(),
            target_column,
        );
        api.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        let api = self.stores.apis.save(&api).await?;
        self.stores.ledger.open(&api.id).await?;

        info!(
            api_id = %api.id,
            model_id = %api.model_id,
            algorithm = %api.artifact.algorithm,
            version = %api.version(),
            "Generated API created"
        );
        Ok(api)
    }

    async fn candidate_artifact(&self, model_id: &ModelId, algorithm: Algorithm) -> Result<ArtifactRef> {
        let run = self.latest_run(model_id).await?;
        let candidate = run
            .candidate(algorithm)
            .ok_or_else(|| CoreError::NotFound(format!("{} in the latest run of model {}", algorithm, model_id)))?;
        match (&candidate.artifact_path, candidate.version) {
            (Some(path), Some(version)) => Ok(ArtifactRef {
                model_id: *model_id,
                algorithm,
                version,
                path: path.clone(),
            }),
            _ => Err(CoreError::Validation(format!(
                "{} failed to train in the latest run: {}",
                algorithm,
                candidate.error.as_deref().unwrap_or("no artifact")
            ))),
        }
    }

    async fn with_live_metrics(&self, mut api: GeneratedApi) -> Result<GeneratedApi> {
        api.metrics = self.stores.ledger.aggregate(&api.id).await?;
        Ok(api)
    }

    pub async fn list_apis(&self, limit: usize, offset: usize) -> Result<Vec<GeneratedApi>> {
        let apis = self.stores.apis.list(limit, offset).await?;
        let mut live = Vec::with_capacity(apis.len());
        for api in apis {
            live.push(self.with_live_metrics(api).await?);
        }
        Ok(live)
    }

    pub async fn get_api(&self, api_id: &ApiId) -> Result<GeneratedApi> {
        let api = self
            .stores
            .apis
            .find_by_id(api_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("API {}", api_id)))?;
        self.with_live_metrics(api).await
    }

    /// Most recent first, capped by the configured history limit.
    pub async fn usage_history(&self, api_id: &ApiId, limit: usize) -> Result<Vec<UsageEvent>> {
        self.get_api(api_id).await?;
        let limit = limit.min(self.config.serving.usage_history_limit);
        self.stores.ledger.events(api_id, limit).await
    }

    /// Latency distribution and outcome counts over the retained history window.
    pub async fn usage_summary(&self, api_id: &ApiId) -> Result<UsageSummary> {
        let events = self
            .usage_history(api_id, self.config.serving.usage_history_limit)
            .await?;
        LatencyCalculator.calculate(&events)
    }

    // ===== Predictions =====

    pub async fn predict(&self, api_id: &ApiId, record: Record) -> Result<SinglePrediction> {
        let outcome = self.predict_batch(api_id, vec![record]).await?;
        let prediction = outcome
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::Internal("prediction returned no value".to_string()))?;
        Ok(SinglePrediction {
            prediction,
            response_time_ms: outcome.response_time_ms,
        })
    }

    pub async fn predict_batch(&self, api_id: &ApiId, records: Vec<Record>) -> Result<PredictionOutcome> {
        let api = self
            .stores
            .apis
            .find_by_id(api_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("API {}", api_id)))?;
        self.gateway.serve(&api, records).await
    }

    // ===== Dashboard =====

    pub async fn dashboard(&self) -> Result<DashboardMetrics> {
        let total_models = self.stores.models.count().await?;
        let aggregates = self.stores.ledger.all_aggregates().await?;
        Ok(UsageAggregator::dashboard(
            total_models,
            aggregates.iter().map(|(_, metrics)| metrics),
        ))
    }
}
