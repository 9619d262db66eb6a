use async_trait::async_trait;
use sqlx::PgPool;
use tabml_core::{
    ModelId, Repository, Result, TrainingRun, TrainingRunId, TrainingRunRepository,
};

use super::document;

pub struct PgTrainingRunRepository {
    pool: PgPool,
}

impl PgTrainingRunRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<TrainingRun, TrainingRunId> for PgTrainingRunRepository {
    async fn find_by_id(&self, id: &TrainingRunId) -> Result<Option<TrainingRun>> {
        let row = sqlx::query("SELECT document FROM training_runs WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(document).transpose()
    }

    async fn save(&self, entity: &TrainingRun) -> Result<TrainingRun> {
        let row = sqlx::query(
            r#"
            INSERT INTO training_runs (id, model_id, created_at, document)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET document = EXCLUDED.document
            RETURNING document
            "#,
        )
        .bind(entity.id.as_uuid())
        .bind(entity.model_id.as_uuid())
        .bind(entity.created_at)
        .bind(serde_json::to_value(entity)?)
        .fetch_one(&self.pool)
        .await?;

        document(&row)
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<TrainingRun>> {
        let rows = sqlx::query(
            r#"
            SELECT document FROM training_runs
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(document).collect()
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM training_runs")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl TrainingRunRepository for PgTrainingRunRepository {
    async fn latest_for_model(&self, model_id: &ModelId) -> Result<Option<TrainingRun>> {
        let row = sqlx::query(
            r#"
            SELECT document FROM training_runs
            WHERE model_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(model_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(document).transpose()
    }
}
