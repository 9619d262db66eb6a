pub mod dto;
pub mod error;
pub mod handlers;

pub use dto::*;
pub use error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tabml_workflow::Platform;

use handlers::{apis, dashboard, models, predictions};

/// Upper bound on an uploaded CSV body.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub platform: Arc<Platform>,
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(platform: Arc<Platform>) -> Self {
        Self {
            platform,
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        // Models
        .route("/models", post(models::create).get(models::list))
        .route("/models/:id", get(models::get))
        .route(
            "/models/:id/dataset",
            post(models::upload_dataset).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/models/:id/analysis", get(models::analyze))
        .route("/models/:id/train", post(models::train))
        .route("/models/:id/runs/latest", get(models::latest_run))
        // Generated APIs
        .route("/apis", post(apis::create).get(apis::list))
        .route("/apis/:id", get(apis::get))
        .route("/apis/:id/usage", get(apis::usage))
        .route("/apis/:id/usage/summary", get(apis::usage_summary))
        .route("/apis/:id/predict", post(predictions::predict))
        .route("/apis/:id/predict/batch", post(predictions::predict_batch))
        // Platform
        .route("/dashboard", get(dashboard::dashboard))
        .route("/metrics", get(dashboard::prometheus))
        .route("/health", get(dashboard::health))
        .with_state(state)
}
