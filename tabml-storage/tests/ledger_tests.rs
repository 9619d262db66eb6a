use std::sync::Arc;

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;
use tabml_core::{ApiId, CoreError, UsageEvent, UsageLedger};
use tabml_storage::InMemoryUsageLedger;

#[tokio::test]
async fn test_record_updates_aggregate() {
    let ledger = InMemoryUsageLedger::new();
    let api_id = ApiId::new();
    ledger.open(&api_id).await.unwrap();

    ledger
        .record(UsageEvent::success(api_id, 10.0, 4.0, 0.5))
        .await
        .unwrap();
    let metrics = ledger
        .record(UsageEvent::failure(api_id, 30.0, 1.0, 0.1, "schema mismatch"))
        .await
        .unwrap();

    assert_eq!(metrics.total_requests, 2);
    assert_eq!(metrics.successful_requests, 1);
    assert_eq!(metrics.failed_requests, 1);
    assert_relative_eq!(metrics.average_response_time_ms, 20.0, epsilon = 1e-9);
    assert_relative_eq!(metrics.total_cpu_time_ms, 5.0, epsilon = 1e-9);
    assert_relative_eq!(metrics.total_memory_mb, 0.6, epsilon = 1e-9);
    assert_eq!(ledger.aggregate(&api_id).await.unwrap(), metrics);
}

#[tokio::test]
async fn test_open_is_idempotent() {
    let ledger = InMemoryUsageLedger::new();
    let api_id = ApiId::new();
    ledger.open(&api_id).await.unwrap();
    ledger
        .record(UsageEvent::success(api_id, 10.0, 1.0, 0.1))
        .await
        .unwrap();
    ledger.open(&api_id).await.unwrap();

    assert_eq!(ledger.aggregate(&api_id).await.unwrap().total_requests, 1);
}

#[tokio::test]
async fn test_unknown_api_is_not_found() {
    let ledger = InMemoryUsageLedger::new();
    let api_id = ApiId::new();

    assert!(matches!(
        ledger.record(UsageEvent::success(api_id, 1.0, 1.0, 0.1)).await,
        Err(CoreError::NotFound(_))
    ));
    assert!(matches!(ledger.aggregate(&api_id).await, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn test_events_most_recent_first() {
    let ledger = InMemoryUsageLedger::new();
    let api_id = ApiId::new();
    ledger.open(&api_id).await.unwrap();

    for ms in [1.0, 2.0, 3.0, 4.0] {
        ledger
            .record(UsageEvent::success(api_id, ms, 0.0, 0.1))
            .await
            .unwrap();
    }

    let events = ledger.events(&api_id, 3).await.unwrap();
    let times: Vec<f64> = events.iter().map(|e| e.response_time_ms).collect();
    assert_eq!(times, vec![4.0, 3.0, 2.0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_records_lose_no_updates() {
    let ledger = Arc::new(InMemoryUsageLedger::new());
    let api_id = ApiId::new();
    ledger.open(&api_id).await.unwrap();

    let samples: Vec<f64> = (0..100).map(|i| 10.0 + (i % 11) as f64).collect();
    let tasks = samples.iter().map(|&ms| {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move { ledger.record(UsageEvent::success(api_id, ms, 1.0, 0.1)).await })
    });
    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let metrics = ledger.aggregate(&api_id).await.unwrap();
    let true_mean = samples.iter().sum::<f64>() / samples.len() as f64;

    assert_eq!(metrics.total_requests, 100);
    assert_eq!(metrics.successful_requests, 100);
    assert_relative_eq!(metrics.average_response_time_ms, true_mean, epsilon = 1e-9);
    assert_relative_eq!(metrics.total_response_time_ms, samples.iter().sum::<f64>(), epsilon = 1e-9);
    assert_eq!(ledger.events(&api_id, 1000).await.unwrap().len(), 100);
}

#[tokio::test]
async fn test_all_aggregates_covers_every_api() {
    let ledger = InMemoryUsageLedger::new();
    let a = ApiId::new();
    let b = ApiId::new();
    ledger.open(&a).await.unwrap();
    ledger.open(&b).await.unwrap();
    ledger.record(UsageEvent::success(a, 5.0, 1.0, 0.1)).await.unwrap();

    let mut aggregates = ledger.all_aggregates().await.unwrap();
    aggregates.sort_by_key(|(id, _)| *id);
    assert_eq!(aggregates.len(), 2);
    let total: u64 = aggregates.iter().map(|(_, m)| m.total_requests).sum();
    assert_eq!(total, 1);
}
