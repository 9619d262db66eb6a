//! Process-local repositories backed by `DashMap`.

use std::hash::Hash;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tabml_core::{
    ApiId, ApiRepository, GeneratedApi, Model, ModelId, Repository, Result, TrainingRun,
    TrainingRunId, TrainingRunRepository,
};

/// An entity the in-memory store can key and order.
pub trait Stored: Clone + Send + Sync + 'static {
    type Id: Eq + Hash + Copy + Send + Sync + 'static;

    fn key(&self) -> Self::Id;
    fn created_at(&self) -> DateTime<Utc>;
}

impl Stored for Model {
    type Id = ModelId;

    fn key(&self) -> ModelId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Stored for TrainingRun {
    type Id = TrainingRunId;

    fn key(&self) -> TrainingRunId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Stored for GeneratedApi {
    type Id = ApiId;

    fn key(&self) -> ApiId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

pub struct MemoryRepository<T: Stored> {
    entries: DashMap<T::Id, T>,
}

pub type InMemoryModelRepository = MemoryRepository<Model>;
pub type InMemoryTrainingRunRepository = MemoryRepository<TrainingRun>;
pub type InMemoryApiRepository = MemoryRepository<GeneratedApi>;

impl<T: Stored> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// All entities matching `filter`, newest first.
    fn collect_where(&self, filter: impl Fn(&T) -> bool) -> Vec<T> {
        let mut items: Vec<T> = self
            .entries
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        items
    }
}

impl<T: Stored> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Stored> Repository<T, T::Id> for MemoryRepository<T> {
    async fn find_by_id(&self, id: &T::Id) -> Result<Option<T>> {
        Ok(self.entries.get(id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, entity: &T) -> Result<T> {
        self.entries.insert(entity.key(), entity.clone());
        Ok(entity.clone())
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<T>> {
        Ok(self
            .collect_where(|_| true)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.entries.len() as u64)
    }
}

#[async_trait]
impl TrainingRunRepository for MemoryRepository<TrainingRun> {
    async fn latest_for_model(&self, model_id: &ModelId) -> Result<Option<TrainingRun>> {
        Ok(self
            .collect_where(|run| run.model_id == *model_id)
            .into_iter()
            .next())
    }
}

#[async_trait]
impl ApiRepository for MemoryRepository<GeneratedApi> {
    async fn find_by_name(&self, name: &str) -> Result<Option<GeneratedApi>> {
        Ok(self
            .entries
            .iter()
            .find(|entry| entry.value().name == name)
            .map(|entry| entry.value().clone()))
    }

    async fn list_for_model(&self, model_id: &ModelId) -> Result<Vec<GeneratedApi>> {
        Ok(self.collect_where(|api| api.model_id == *model_id))
    }
}
