use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tabml_core::{CoreError, Result, StorageConfig};

/// Configuration for the PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 5,
            idle_timeout_seconds: 600, // 10 minutes
        }
    }
}

impl PostgresConfig {
    pub fn new(database_url: String) -> Self {
        Self {
            database_url,
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}

impl TryFrom<&StorageConfig> for PostgresConfig {
    type Error = CoreError;

    fn try_from(config: &StorageConfig) -> Result<Self> {
        let url = config.database_url.clone().ok_or_else(|| {
            CoreError::Validation("storage.database_url is required for the postgres backend".to_string())
        })?;
        Ok(Self::new(url).with_max_connections(config.max_connections))
    }
}

/// Create a PostgreSQL connection pool
pub async fn create_pool(config: &PostgresConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
        .idle_timeout(Some(Duration::from_secs(config.idle_timeout_seconds)))
        .connect(&config.database_url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        "PostgreSQL connection pool created"
    );

    Ok(pool)
}

/// Run database migrations
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| CoreError::Database(e.to_string()))?;
    tracing::info!("Database migrations completed");
    Ok(())
}
