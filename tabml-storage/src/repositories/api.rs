use async_trait::async_trait;
use sqlx::PgPool;
use tabml_core::{ApiId, ApiRepository, GeneratedApi, ModelId, Repository, Result};

use super::{document, unique_violation};

/// Generated APIs. Names are unique; the live metrics aggregate is owned by
/// the usage ledger, so the stored document carries the creation-time copy.
pub struct PgApiRepository {
    pool: PgPool,
}

impl PgApiRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<GeneratedApi, ApiId> for PgApiRepository {
    async fn find_by_id(&self, id: &ApiId) -> Result<Option<GeneratedApi>> {
        let row = sqlx::query("SELECT document FROM generated_apis WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(document).transpose()
    }

    async fn save(&self, entity: &GeneratedApi) -> Result<GeneratedApi> {
        let row = sqlx::query(
            r#"
            INSERT INTO generated_apis (id, model_id, name, created_at, document)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                document = EXCLUDED.document
            RETURNING document
            "#,
        )
        .bind(entity.id.as_uuid())
        .bind(entity.model_id.as_uuid())
        .bind(&entity.name)
        .bind(entity.created_at)
        .bind(serde_json::to_value(entity)?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, &format!("API named '{}'", entity.name)))?;

        document(&row)
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<GeneratedApi>> {
        let rows = sqlx::query(
            r#"
            SELECT document FROM generated_apis
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
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM generated_apis")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl ApiRepository for PgApiRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<GeneratedApi>> {
        let row = sqlx::query("SELECT document FROM generated_apis WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(document).transpose()
    }

    async fn list_for_model(&self, model_id: &ModelId) -> Result<Vec<GeneratedApi>> {
        let rows = sqlx::query(
            r#"
            SELECT document FROM generated_apis
            WHERE model_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(model_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(document).collect()
    }
}
