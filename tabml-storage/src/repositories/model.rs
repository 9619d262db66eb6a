use async_trait::async_trait;
use sqlx::PgPool;
use tabml_core::{Model, ModelId, Repository, Result};

use super::document;

pub struct PgModelRepository {
    pool: PgPool,
}

impl PgModelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<Model, ModelId> for PgModelRepository {
    async fn find_by_id(&self, id: &ModelId) -> Result<Option<Model>> {
        let row = sqlx::query("SELECT document FROM models WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(document).transpose()
    }

    async fn save(&self, entity: &Model) -> Result<Model> {
        let row = sqlx::query(
            r#"
            INSERT INTO models (id, name, created_at, updated_at, document)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                updated_at = EXCLUDED.updated_at,
                document = EXCLUDED.document
            RETURNING document
            "#,
        )
        .bind(entity.id.as_uuid())
        .bind(&entity.name)
        .bind(entity.created_at)
        .bind(entity.updated_at)
        .bind(serde_json::to_value(entity)?)
        .fetch_one(&self.pool)
        .await?;

        document(&row)
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Model>> {
        let rows = sqlx::query(
            r#"
            SELECT document FROM models
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
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM models")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }
}
