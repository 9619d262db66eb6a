use tabml_core::{ApiMetrics, DashboardMetrics};

/// Platform-wide usage totals folded from every API's aggregate.
///
/// The global average response time is weighted by request volume:
/// `sum(total_response_time_ms) / sum(total_requests)`. Per-API averages are
/// never averaged directly.
pub struct UsageAggregator;

impl UsageAggregator {
    pub fn dashboard<'a, I>(total_models: u64, per_api: I) -> DashboardMetrics
    where
        I: IntoIterator<Item = &'a ApiMetrics>,
    {
        let mut dashboard = DashboardMetrics {
            total_models,
            ..Default::default()
        };

        for metrics in per_api {
            dashboard.total_apis += 1;
            dashboard.total_requests += metrics.total_requests;
            dashboard.successful_requests += metrics.successful_requests;
            dashboard.failed_requests += metrics.failed_requests;
            dashboard.total_cpu_time_ms += metrics.total_cpu_time_ms;
            dashboard.total_memory_mb += metrics.total_memory_mb;
            dashboard.total_response_time_ms += metrics.total_response_time_ms;
        }

        if dashboard.total_requests > 0 {
            dashboard.average_response_time_ms =
                dashboard.total_response_time_ms / dashboard.total_requests as f64;
        }

        dashboard
    }
}
