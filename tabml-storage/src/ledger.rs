//! Usage ledgers: the only place API metrics are mutated.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::{PgPool, Row};
use tabml_core::{ApiId, ApiMetrics, CoreError, Result, UsageEvent, UsageEventId, UsageLedger};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
struct LedgerEntry {
    metrics: ApiMetrics,
    events: Vec<UsageEvent>,
}

/// Ledger held in process memory. Each API has its own lock, so appends to
/// different APIs never contend.
#[derive(Default)]
pub struct InMemoryUsageLedger {
    entries: DashMap<ApiId, Arc<Mutex<LedgerEntry>>>,
}

impl InMemoryUsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, api_id: &ApiId) -> Result<Arc<Mutex<LedgerEntry>>> {
        self.entries
            .get(api_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CoreError::NotFound(format!("usage ledger for API {}", api_id)))
    }
}

#[async_trait]
impl UsageLedger for InMemoryUsageLedger {
    async fn open(&self, api_id: &ApiId) -> Result<()> {
        self.entries.entry(*api_id).or_default();
        Ok(())
    }

    async fn record(&self, event: UsageEvent) -> Result<ApiMetrics> {
        let entry = self.entry(&event.api_id)?;
        let mut guard = entry.lock().await;
        guard.metrics.apply(&event);
        guard.events.push(event);
        Ok(guard.metrics.clone())
    }

    async fn aggregate(&self, api_id: &ApiId) -> Result<ApiMetrics> {
        let entry = self.entry(api_id)?;
        let guard = entry.lock().await;
        Ok(guard.metrics.clone())
    }

    async fn all_aggregates(&self) -> Result<Vec<(ApiId, ApiMetrics)>> {
        let entries: Vec<(ApiId, Arc<Mutex<LedgerEntry>>)> = self
            .entries
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut aggregates = Vec::with_capacity(entries.len());
        for (api_id, entry) in entries {
            aggregates.push((api_id, entry.lock().await.metrics.clone()));
        }
        Ok(aggregates)
    }

    async fn events(&self, api_id: &ApiId, limit: usize) -> Result<Vec<UsageEvent>> {
        let entry = self.entry(api_id)?;
        let guard = entry.lock().await;
        Ok(guard.events.iter().rev().take(limit).cloned().collect())
    }
}

/// Ledger stored in PostgreSQL. `record` locks the API's metrics row inside a
/// transaction, so the event insert and the aggregate update commit together.
pub struct PgUsageLedger {
    pool: PgPool,
}

impl PgUsageLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageLedger for PgUsageLedger {
    async fn open(&self, api_id: &ApiId) -> Result<()> {
        sqlx::query("INSERT INTO api_metrics (api_id) VALUES ($1) ON CONFLICT (api_id) DO NOTHING")
            .bind(api_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record(&self, event: UsageEvent) -> Result<ApiMetrics> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT total_requests, successful_requests, failed_requests,
                   total_cpu_time_ms, total_memory_mb, total_response_time_ms,
                   average_response_time_ms
            FROM api_metrics
            WHERE api_id = $1
            FOR UPDATE
            "#,
        )
        .bind(event.api_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("usage ledger for API {}", event.api_id)))?;

        let mut metrics = row_to_metrics(&row)?;
        metrics.apply(&event);

        sqlx::query(
            r#"
            INSERT INTO usage_events (
                id, api_id, success, response_time_ms, cpu_time_ms, memory_mb,
                error_message, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.api_id.as_uuid())
        .bind(event.success)
        .bind(event.response_time_ms)
        .bind(event.cpu_time_ms)
        .bind(event.memory_mb)
        .bind(&event.error_message)
        .bind(event.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE api_metrics
            SET total_requests = $2, successful_requests = $3, failed_requests = $4,
                total_cpu_time_ms = $5, total_memory_mb = $6,
                total_response_time_ms = $7, average_response_time_ms = $8
            WHERE api_id = $1
            "#,
        )
        .bind(event.api_id.as_uuid())
        .bind(metrics.total_requests as i64)
        .bind(metrics.successful_requests as i64)
        .bind(metrics.failed_requests as i64)
        .bind(metrics.total_cpu_time_ms)
        .bind(metrics.total_memory_mb)
        .bind(metrics.total_response_time_ms)
        .bind(metrics.average_response_time_ms)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(api_id = %event.api_id, success = event.success, "Recorded usage event");
        Ok(metrics)
    }

    async fn aggregate(&self, api_id: &ApiId) -> Result<ApiMetrics> {
        let row = sqlx::query(
            r#"
            SELECT total_requests, successful_requests, failed_requests,
                   total_cpu_time_ms, total_memory_mb, total_response_time_ms,
                   average_response_time_ms
            FROM api_metrics
            WHERE api_id = $1
            "#,
        )
        .bind(api_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("usage ledger for API {}", api_id)))?;

        row_to_metrics(&row)
    }

    async fn all_aggregates(&self) -> Result<Vec<(ApiId, ApiMetrics)>> {
        let rows = sqlx::query(
            r#"
            SELECT api_id, total_requests, successful_requests, failed_requests,
                   total_cpu_time_ms, total_memory_mb, total_response_time_ms,
                   average_response_time_ms
            FROM api_metrics
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let api_id: uuid::Uuid = row.try_get("api_id")?;
                Ok((ApiId::from(api_id), row_to_metrics(row)?))
            })
            .collect()
    }

    async fn events(&self, api_id: &ApiId, limit: usize) -> Result<Vec<UsageEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, api_id, success, response_time_ms, cpu_time_ms, memory_mb,
                   error_message, created_at
            FROM usage_events
            WHERE api_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(api_id.as_uuid())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_event).collect()
    }
}

fn row_to_metrics(row: &sqlx::postgres::PgRow) -> Result<ApiMetrics> {
    let total_requests: i64 = row.try_get("total_requests")?;
    let successful_requests: i64 = row.try_get("successful_requests")?;
    let failed_requests: i64 = row.try_get("failed_requests")?;

    Ok(ApiMetrics {
        total_requests: total_requests.max(0) as u64,
        successful_requests: successful_requests.max(0) as u64,
        failed_requests: failed_requests.max(0) as u64,
        total_cpu_time_ms: row.try_get("total_cpu_time_ms")?,
        total_memory_mb: row.try_get("total_memory_mb")?,
        total_response_time_ms: row.try_get("total_response_time_ms")?,
        average_response_time_ms: row.try_get("average_response_time_ms")?,
    })
}

fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<UsageEvent> {
    let id: uuid::Uuid = row.try_get("id")?;
    let api_id: uuid::Uuid = row.try_get("api_id")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(UsageEvent {
        id: UsageEventId::from(id),
        api_id: ApiId::from(api_id),
        success: row.try_get("success")?,
        response_time_ms: row.try_get("response_time_ms")?,
        cpu_time_ms: row.try_get("cpu_time_ms")?,
        memory_mb: row.try_get("memory_mb")?,
        error_message: row.try_get("error_message")?,
        created_at,
    })
}
