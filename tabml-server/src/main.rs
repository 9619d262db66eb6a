use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tabml_core::StorageBackend;
use tabml_storage::postgres::{create_pool, migrate, PostgresConfig};
use tabml_workflow::{Platform, Stores};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::{Config, LogFormat};

#[derive(Debug, Parser)]
#[command(name = "tabml", about = "Tabular ML training and serving platform")]
struct Cli {
    /// Extra configuration file layered over config/default and config/local.
    #[arg(long, env = "TABML_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listening port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    init_tracing(&config);
    tracing::info!("Starting tabml server");

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    let stores = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory storage");
            Stores::in_memory()
        }
        StorageBackend::Postgres => {
            let pg_config = PostgresConfig::try_from(&config.storage)?;
            let pool = create_pool(&pg_config).await?;
            migrate(&pool).await?;
            tracing::info!("Database pool initialized");
            Stores::postgres(pool)
        }
    };

    let platform = Arc::new(Platform::new(config.platform(), stores)?);
    tracing::info!(
        artifact_root = %config.storage.artifact_root,
        max_concurrent_runs = config.training.max_concurrent_runs,
        "Platform initialized"
    );

    let state = tabml_api::AppState::new(platform).with_prometheus(prometheus);
    let app = tabml_api::routes(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.server.log_level.clone().into());
    let json = config.server.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
