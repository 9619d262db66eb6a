use std::fmt::Write;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tabml_api::{routes, AppState};
use tabml_core::PlatformConfig;
use tabml_workflow::{Platform, Stores};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

// ===== Test Helper Functions =====

fn create_app() -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    let mut config = PlatformConfig::default();
    config.storage.artifact_root = dir.path().join("artifacts").to_string_lossy().into_owned();
    config.training.n_trees = 15;
    config.training.boosting_rounds = 20;
    let platform = Platform::new(config, Stores::in_memory()).unwrap();
    (dir, routes(AppState::new(Arc::new(platform))))
}

fn churn_csv() -> String {
    let mut csv = String::from("tenure,spend,plan,churned\n");
    for i in 0..80 {
        let tenure = (i % 16) as f64;
        let spend = ((i * 11) % 13) as f64;
        let plan = ["basic", "pro"][i % 2];
        let label = if tenure + spend > 14.0 { "yes" } else { "no" };
        writeln!(csv, "{},{},{},{}", tenure, spend, plan, label).unwrap();
    }
    csv
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().uri(uri).method(method);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    read(app.clone().oneshot(request).await.unwrap()).await
}

async fn upload(app: &Router, model_id: &str, csv: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(format!("/models/{}/dataset?dataset_ref=churn.csv", model_id))
        .method("POST")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(csv))
        .unwrap();
    read(app.clone().oneshot(request).await.unwrap()).await
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn trained_api(app: &Router) -> String {
    let (_, model) = send(app, "POST", "/models", Some(json!({ "name": "churn" }))).await;
    let model_id = model["id"].as_str().unwrap().to_string();
    upload(app, &model_id, churn_csv()).await;
    let (status, _) = send(
        app,
        "POST",
        &format!("/models/{}/train", model_id),
        Some(json!({
            "task": "classification",
            "target_column": "churned",
            "feature_columns": ["tenure", "spend", "plan"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, api) = send(
        app,
        "POST",
        "/apis",
        Some(json!({ "model_id": model_id, "name": "churn-api" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    api["id"].as_str().unwrap().to_string()
}

// ===== Model Handler Tests =====

#[tokio::test]
async fn test_create_model_success() {
    let (_dir, app) = create_app();

    let (status, body) = send(
        &app,
        "POST",
        "/models",
        Some(json!({ "name": "churn", "description": "Customer churn" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "churn");
    assert_eq!(body["trained"], false);
}

#[tokio::test]
async fn test_create_model_validation_error() {
    let (_dir, app) = create_app();

    let (status, body) = send(&app, "POST", "/models", Some(json!({ "name": "" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation error");
}

#[tokio::test]
async fn test_get_unknown_model_returns_404() {
    let (_dir, app) = create_app();

    let (status, _) = send(&app, "GET", &format!("/models/{}", Uuid::new_v4()), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_models_pagination() {
    let (_dir, app) = create_app();
    for name in ["a", "b", "c"] {
        send(&app, "POST", "/models", Some(json!({ "name": name }))).await;
    }

    let (status, body) = send(&app, "GET", "/models?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["has_more"], true);

    let (status, _) = send(&app, "GET", "/models?limit=500", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_and_analyze_dataset() {
    let (_dir, app) = create_app();
    let (_, model) = send(&app, "POST", "/models", Some(json!({ "name": "churn" }))).await;
    let model_id = model["id"].as_str().unwrap();

    let (status, profile) = upload(&app, model_id, churn_csv()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["row_count"], 80);
    assert_eq!(profile["column_count"], 4);

    let (status, analysis) = send(
        &app,
        "GET",
        &format!("/models/{}/analysis?target=churned", model_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analysis["advice"]["task"], "classification");
}

#[tokio::test]
async fn test_upload_ragged_csv_is_bad_request() {
    let (_dir, app) = create_app();
    let (_, model) = send(&app, "POST", "/models", Some(json!({ "name": "broken" }))).await;
    let model_id = model["id"].as_str().unwrap();

    let (status, _) = upload(&app, model_id, "a,b\n1,2\n3\n".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_train_rejects_target_in_features() {
    let (_dir, app) = create_app();
    let (_, model) = send(&app, "POST", "/models", Some(json!({ "name": "churn" }))).await;
    let model_id = model["id"].as_str().unwrap();
    upload(&app, model_id, churn_csv()).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/models/{}/train", model_id),
        Some(json!({
            "task": "classification",
            "target_column": "churned",
            "feature_columns": ["tenure", "churned"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_train_with_singleton_class_is_unprocessable() {
    let (_dir, app) = create_app();
    let (_, model) = send(&app, "POST", "/models", Some(json!({ "name": "rare" }))).await;
    let model_id = model["id"].as_str().unwrap();

    let mut csv = String::from("x,label\n");
    for i in 0..30 {
        let label = if i == 0 { "rare" } else if i % 2 == 0 { "a" } else { "b" };
        writeln!(csv, "{},{}", i, label).unwrap();
    }
    upload(&app, model_id, csv).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/models/{}/train", model_id),
        Some(json!({
            "task": "classification",
            "target_column": "label",
            "feature_columns": ["x"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ===== Generated API Handler Tests =====

#[tokio::test]
async fn test_end_to_end_prediction_flow() {
    let (_dir, app) = create_app();
    let api_id = trained_api(&app).await;

    let (status, single) = send(
        &app,
        "POST",
        &format!("/apis/{}/predict", api_id),
        Some(json!({ "features": { "tenure": 1, "spend": 0, "plan": "basic" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(single["prediction"].is_string());

    let (status, batch) = send(
        &app,
        "POST",
        &format!("/apis/{}/predict/batch", api_id),
        Some(json!({ "records": [
            { "tenure": 15, "spend": 12, "plan": "pro" },
            { "tenure": 0, "spend": 1, "plan": "basic" },
        ] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(batch["count"], 2);
    assert_eq!(batch["metrics"]["total_requests"], 2);

    let (status, api) = send(&app, "GET", &format!("/apis/{}", api_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(api["metrics"]["successful_requests"], 2);
    assert!(api["version"].as_str().unwrap().starts_with('v'));

    let (status, usage) = send(&app, "GET", &format!("/apis/{}/usage?limit=1", api_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(usage.as_array().unwrap().len(), 1);

    let (status, summary) =
        send(&app, "GET", &format!("/apis/{}/usage/summary", api_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["latency"]["count"], 2);
    assert_eq!(summary["successes"], 2);

    let (status, dashboard) = send(&app, "GET", "/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["total_models"], 1);
    assert_eq!(dashboard["total_apis"], 1);
    assert_eq!(dashboard["total_requests"], 2);
}

#[tokio::test]
async fn test_prediction_schema_mismatch_is_bad_request() {
    let (_dir, app) = create_app();
    let api_id = trained_api(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/apis/{}/predict", api_id),
        Some(json!({ "features": { "tenure": 1, "plan": "basic" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"].as_str().unwrap().contains("Schema mismatch"));

    let (_, api) = send(&app, "GET", &format!("/apis/{}", api_id), None).await;
    assert_eq!(api["metrics"]["failed_requests"], 1);
}

#[tokio::test]
async fn test_duplicate_api_name_conflicts() {
    let (_dir, app) = create_app();
    let api_id = trained_api(&app).await;
    let (_, api) = send(&app, "GET", &format!("/apis/{}", api_id), None).await;

    let (status, _) = send(
        &app,
        "POST",
        "/apis",
        Some(json!({ "model_id": api["model_id"], "name": "churn-api" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_predict_unknown_api_returns_404() {
    let (_dir, app) = create_app();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/apis/{}/predict", Uuid::new_v4()),
        Some(json!({ "features": { "x": 1 } })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ===== Platform Endpoints =====

#[tokio::test]
async fn test_health() {
    let (_dir, app) = create_app();

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let (_dir, app) = create_app();

    let (status, _) = send(&app, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
