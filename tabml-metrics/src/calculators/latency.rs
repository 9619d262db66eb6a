use serde::{Deserialize, Serialize};
use std::time::Instant;
use tabml_core::{MetricCalculator, Result, UsageEvent};

/// Response-time distribution over a window of usage events.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LatencyMetrics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub std_dev: f64,
}

impl LatencyMetrics {
    pub fn from_measurements(measurements: &[f64]) -> Self {
        if measurements.is_empty() {
            return Self::default();
        }

        let mut sorted = measurements.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = measurements.len() as f64;
        let mean = measurements.iter().sum::<f64>() / n;
        let variance = measurements.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        Self {
            count: measurements.len(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean,
            median: percentile(&sorted, 50.0),
            p90: percentile(&sorted, 90.0),
            p95: percentile(&sorted, 95.0),
            p99: percentile(&sorted, 99.0),
            std_dev: variance.sqrt(),
        }
    }
}

/// Nearest-rank percentile of already sorted values.
pub fn percentile(sorted_values: &[f64], percentile: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }
    let index = (percentile / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[index.min(sorted_values.len() - 1)]
}

/// Summary of a usage window: the latency distribution plus outcome counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UsageSummary {
    pub latency: LatencyMetrics,
    pub successes: usize,
    pub failures: usize,
    pub total_cpu_time_ms: f64,
    pub total_memory_mb: f64,
}

pub struct LatencyCalculator;

impl LatencyCalculator {
    pub fn start() -> Instant {
        Instant::now()
    }

    /// Milliseconds elapsed since `start`.
    pub fn measure(start: Instant) -> f64 {
        start.elapsed().as_secs_f64() * 1000.0
    }
}

impl MetricCalculator for LatencyCalculator {
    type Input = Vec<UsageEvent>;
    type Output = UsageSummary;

    fn calculate(&self, input: &Self::Input) -> Result<Self::Output> {
        let times: Vec<f64> = input.iter().map(|e| e.response_time_ms).collect();
        let successes = input.iter().filter(|e| e.success).count();

        Ok(UsageSummary {
            latency: LatencyMetrics::from_measurements(&times),
            successes,
            failures: input.len() - successes,
            total_cpu_time_ms: input.iter().map(|e| e.cpu_time_ms).sum(),
            total_memory_mb: input.iter().map(|e| e.memory_mb).sum(),
        })
    }
}
