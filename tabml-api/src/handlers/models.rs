use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tabml_core::{DatasetProfile, ModelId, TrainingRun};
use tabml_ml::loader::read_csv_bytes;
use tabml_workflow::DatasetAnalysis;
use uuid::Uuid;
use validator::Validate;

use crate::{dto::*, error::{ApiError, ApiResult}, AppState};

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateModelRequest>,
) -> ApiResult<(StatusCode, Json<ModelResponse>)> {
    payload.validate()?;

    let model = state
        .platform
        .create_model(payload.name, payload.description)
        .await?;

    Ok((StatusCode::CREATED, Json(ModelResponse::from(model))))
}

pub async fn list(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationQuery>,
) -> ApiResult<Json<PaginatedResponse<ModelResponse>>> {
    pagination.validate()?;

    let models = state
        .platform
        .list_models(pagination.limit(), pagination.offset())
        .await?;
    let data = models.into_iter().map(ModelResponse::from).collect();

    Ok(Json(PaginatedResponse::new(data, &pagination)))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ModelResponse>> {
    let model = state.platform.get_model(&ModelId::from_uuid(id)).await?;
    Ok(Json(ModelResponse::from(model)))
}

/// Accepts a raw CSV body and attaches it to the model.
pub async fn upload_dataset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> ApiResult<Json<DatasetProfile>> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("Request body must contain CSV data".to_string()));
    }

    let dataset = tokio::task::spawn_blocking(move || read_csv_bytes(&body))
        .await
        .map_err(|e| ApiError::Internal(format!("CSV parsing task failed: {}", e)))??;

    let profile = state
        .platform
        .attach_dataset(&ModelId::from_uuid(id), dataset, query.dataset_ref)
        .await?;

    Ok(Json(profile))
}

pub async fn analyze(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AnalyzeQuery>,
) -> ApiResult<Json<DatasetAnalysis>> {
    let analysis = state
        .platform
        .analyze(&ModelId::from_uuid(id), query.target.as_deref())
        .await?;
    Ok(Json(analysis))
}

pub async fn train(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TrainRequest>,
) -> ApiResult<Json<TrainingRun>> {
    payload.validate()?;

    let run = state
        .platform
        .train(&ModelId::from_uuid(id), payload.into())
        .await?;
    Ok(Json(run))
}

pub async fn latest_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TrainingRun>> {
    let run = state.platform.latest_run(&ModelId::from_uuid(id)).await?;
    Ok(Json(run))
}
