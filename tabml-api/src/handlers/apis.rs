use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tabml_core::{ApiId, UsageEvent};
use tabml_metrics::UsageSummary;
use uuid::Uuid;
use validator::Validate;

use crate::{dto::*, error::ApiResult, AppState};

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateApiBody>,
) -> ApiResult<(StatusCode, Json<ApiResponse>)> {
    payload.validate()?;

    let api = state.platform.create_api(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::from(api))))
}

pub async fn list(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationQuery>,
) -> ApiResult<Json<PaginatedResponse<ApiResponse>>> {
    pagination.validate()?;

    let apis = state
        .platform
        .list_apis(pagination.limit(), pagination.offset())
        .await?;
    let data = apis.into_iter().map(ApiResponse::from).collect();

    Ok(Json(PaginatedResponse::new(data, &pagination)))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse>> {
    let api = state.platform.get_api(&ApiId::from_uuid(id)).await?;
    Ok(Json(ApiResponse::from(api)))
}

/// Most recent usage events first.
pub async fn usage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UsageQuery>,
) -> ApiResult<Json<Vec<UsageEvent>>> {
    query.validate()?;

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let events = state
        .platform
        .usage_history(&ApiId::from_uuid(id), limit)
        .await?;
    Ok(Json(events))
}

pub async fn usage_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UsageSummary>> {
    let summary = state.platform.usage_summary(&ApiId::from_uuid(id)).await?;
    Ok(Json(summary))
}
