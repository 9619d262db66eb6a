mod common;

use std::sync::Arc;

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;
use tabml_core::{ApiId, CoreError, Record, Scalar, TaskType};
use tabml_workflow::{CreateApiRequest, Platform, TrainingRequest};

async fn churn_api(platform: &Platform, name: &str) -> ApiId {
    let model = platform.create_model(name.to_string(), None).await.unwrap();
    platform
        .attach_dataset(&model.id, common::dataset(&common::churn_csv()), None)
        .await
        .unwrap();
    platform
        .train(
            &model.id,
            TrainingRequest {
                task: TaskType::Classification,
                target_column: "churned".to_string(),
                feature_columns: common::names(&["x1", "x2", "plan"]),
            },
        )
        .await
        .unwrap();
    platform
        .create_api(CreateApiRequest {
            model_id: model.id,
            name: name.to_string(),
            description: None,
            algorithm: None,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_schema_mismatch_is_recorded_as_failure() {
    let (_dir, platform) = common::platform();
    let api_id = churn_api(&platform, "churn").await;

    let mut missing = common::churn_record(1.0, 2.0, "pro");
    missing.remove("plan");
    let result = platform.predict(&api_id, missing).await;
    assert!(matches!(result, Err(CoreError::SchemaMismatch(_))));

    let mut extra = common::churn_record(1.0, 2.0, "pro");
    extra.insert("age".to_string(), Scalar::Number(40.0));
    let result = platform.predict(&api_id, extra).await;
    assert!(matches!(result, Err(CoreError::SchemaMismatch(_))));

    let api = platform.get_api(&api_id).await.unwrap();
    assert_eq!(api.metrics.total_requests, 2);
    assert_eq!(api.metrics.failed_requests, 2);
    assert_eq!(api.metrics.successful_requests, 0);

    let history = platform.usage_history(&api_id, 10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|e| !e.success));
    assert!(history[0].error_message.as_deref().unwrap().contains("Schema mismatch"));
}

#[tokio::test]
async fn test_invalid_numeric_value_names_the_key() {
    let (_dir, platform) = common::platform();
    let api_id = churn_api(&platform, "churn").await;

    let mut record = common::churn_record(1.0, 2.0, "pro");
    record.insert("x2".to_string(), Scalar::from("lots"));
    match platform.predict(&api_id, record).await {
        Err(CoreError::InvalidFeatureValue { key, .. }) => assert_eq!(key, "x2"),
        other => panic!("expected InvalidFeatureValue, got {:?}", other),
    }
}

#[tokio::test]
async fn test_batch_over_cap_is_rejected() {
    let (_dir, platform) = common::platform();
    let api_id = churn_api(&platform, "churn").await;

    let records: Vec<Record> = (0..1001)
        .map(|i| common::churn_record((i % 20) as f64, 3.0, "basic"))
        .collect();
    match platform.predict_batch(&api_id, records).await {
        Err(CoreError::BatchTooLarge { size, max }) => {
            assert_eq!(size, 1001);
            assert_eq!(max, 1000);
        }
        other => panic!("expected BatchTooLarge, got {:?}", other),
    }

    let records: Vec<Record> = (0..1000)
        .map(|i| common::churn_record((i % 20) as f64, 3.0, "basic"))
        .collect();
    let outcome = platform.predict_batch(&api_id, records).await.unwrap();
    assert_eq!(outcome.predictions.len(), 1000);

    let api = platform.get_api(&api_id).await.unwrap();
    assert_eq!(api.metrics.failed_requests, 1);
    assert_eq!(api.metrics.successful_requests, 1);
}

#[tokio::test]
async fn test_empty_batch_returns_no_predictions() {
    let (_dir, platform) = common::platform();
    let api_id = churn_api(&platform, "churn").await;

    let outcome = platform.predict_batch(&api_id, Vec::new()).await.unwrap();
    assert!(outcome.predictions.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_predictions_keep_exact_metrics() {
    let (_dir, platform) = common::platform();
    let platform = Arc::new(platform);
    let api_id = churn_api(&platform, "churn").await;

    let tasks = (0..100).map(|i| {
        let platform = Arc::clone(&platform);
        tokio::spawn(async move {
            platform
                .predict(&api_id, common::churn_record((i % 20) as f64, 5.0, "team"))
                .await
        })
    });
    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let api = platform.get_api(&api_id).await.unwrap();
    let history = platform.usage_history(&api_id, 1000).await.unwrap();
    let true_mean =
        history.iter().map(|e| e.response_time_ms).sum::<f64>() / history.len() as f64;

    assert_eq!(api.metrics.total_requests, 100);
    assert_eq!(history.len(), 100);
    assert_relative_eq!(api.metrics.average_response_time_ms, true_mean, epsilon = 1e-6);
}

#[tokio::test]
async fn test_dashboard_weights_average_by_traffic() {
    let (_dir, platform) = common::platform();
    let busy = churn_api(&platform, "busy").await;
    let quiet = churn_api(&platform, "quiet").await;

    for i in 0..9 {
        platform
            .predict(&busy, common::churn_record(i as f64, 1.0, "pro"))
            .await
            .unwrap();
    }
    platform
        .predict(&quiet, common::churn_record(3.0, 1.0, "pro"))
        .await
        .unwrap();

    let dashboard = platform.dashboard().await.unwrap();
    let busy = platform.get_api(&busy).await.unwrap().metrics;
    let quiet = platform.get_api(&quiet).await.unwrap().metrics;

    assert_eq!(dashboard.total_models, 2);
    assert_eq!(dashboard.total_apis, 2);
    assert_eq!(dashboard.total_requests, 10);
    assert_relative_eq!(
        dashboard.average_response_time_ms,
        (busy.total_response_time_ms + quiet.total_response_time_ms) / 10.0,
        epsilon = 1e-9
    );
}

#[tokio::test]
async fn test_usage_history_respects_limit() {
    let (_dir, platform) = common::platform_with(|config| config.serving.usage_history_limit = 3);
    let api_id = churn_api(&platform, "churn").await;

    for i in 0..5 {
        platform
            .predict(&api_id, common::churn_record(i as f64, 2.0, "basic"))
            .await
            .unwrap();
    }

    assert_eq!(platform.usage_history(&api_id, 100).await.unwrap().len(), 3);
    assert_eq!(platform.usage_history(&api_id, 2).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_api_is_not_found() {
    let (_dir, platform) = common::platform();
    let result = platform
        .predict(&ApiId::new(), common::churn_record(1.0, 1.0, "pro"))
        .await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));
}
