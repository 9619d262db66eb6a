use axum::{
    extract::{Path, State},
    Json,
};
use tabml_core::ApiId;
use uuid::Uuid;

use crate::{dto::*, error::ApiResult, AppState};

pub async fn predict(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PredictRequest>,
) -> ApiResult<Json<PredictResponse>> {
    let single = state
        .platform
        .predict(&ApiId::from_uuid(id), payload.features)
        .await?;

    Ok(Json(PredictResponse {
        prediction: single.prediction,
        response_time_ms: single.response_time_ms,
    }))
}

pub async fn predict_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BatchPredictRequest>,
) -> ApiResult<Json<BatchPredictResponse>> {
    let outcome = state
        .platform
        .predict_batch(&ApiId::from_uuid(id), payload.records)
        .await?;

    Ok(Json(BatchPredictResponse {
        count: outcome.predictions.len(),
        predictions: outcome.predictions,
        response_time_ms: outcome.response_time_ms,
        metrics: outcome.metrics,
    }))
}
