use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tabml_core::DashboardMetrics;

use crate::{error::ApiResult, AppState};

pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardMetrics>> {
    Ok(Json(state.platform.dashboard().await?))
}

/// Prometheus text exposition, when a recorder is installed.
pub async fn prometheus(State(state): State<AppState>) -> impl IntoResponse {
    match &state.prometheus {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
