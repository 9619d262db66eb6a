use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tabml_core::{
    ApiMetrics, CoreError, GeneratedApi, Record, Result, Scalar, UsageEvent, UsageLedger,
};
use tabml_metrics::LatencyCalculator;
use tracing::warn;

use crate::serving::PredictionService;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const MIN_MEMORY_MB: f64 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionOutcome {
    pub predictions: Vec<Scalar>,
    pub response_time_ms: f64,
    /// The API's aggregate after this request was recorded.
    pub metrics: ApiMetrics,
}

/// Serves predictions through a generated API and accounts every request,
/// successful or not, in the usage ledger.
pub struct EndpointGateway {
    service: Arc<PredictionService>,
    ledger: Arc<dyn UsageLedger>,
}

impl EndpointGateway {
    pub fn new(service: Arc<PredictionService>, ledger: Arc<dyn UsageLedger>) -> Self {
        Self { service, ledger }
    }

    pub fn service(&self) -> &Arc<PredictionService> {
        &self.service
    }

    pub async fn serve(&self, api: &GeneratedApi, records: Vec<Record>) -> Result<PredictionOutcome> {
        let started = LatencyCalculator::start();
        let n_records = records.len();

        let service = Arc::clone(&self.service);
        let path = api.artifact.path.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let cpu_started = Instant::now();
            let result = service.predict(&path, &records);
            (result, LatencyCalculator::measure(cpu_started))
        })
        .await;

        let (result, cpu_time_ms) = match joined {
            Ok(pair) => pair,
            Err(e) => (
                Err(CoreError::Internal(format!("prediction worker failed: {}", e))),
                0.0,
            ),
        };
        let response_time_ms = LatencyCalculator::measure(started);

        match result {
            Ok(batch) => {
                let memory_mb = estimate_memory_mb(n_records, batch.encoded_width);
                let event = UsageEvent::success(api.id, response_time_ms, cpu_time_ms, memory_mb);
                let metrics = self.ledger.record(event).await?;

                metrics::counter!("tabml_predictions_total", "outcome" => "success").increment(1);
                metrics::histogram!("tabml_prediction_latency_ms").record(response_time_ms);

                Ok(PredictionOutcome {
                    predictions: batch.predictions,
                    response_time_ms,
                    metrics,
                })
            }
            Err(error) => {
                warn!(api_id = %api.id, error = %error, "Prediction failed");
                let event = UsageEvent::failure(
                    api.id,
                    response_time_ms,
                    cpu_time_ms,
                    MIN_MEMORY_MB,
                    error.to_string(),
                );
                self.ledger.record(event).await?;

                metrics::counter!("tabml_predictions_total", "outcome" => "failure").increment(1);
                metrics::histogram!("tabml_prediction_latency_ms").record(response_time_ms);

                Err(error)
            }
        }
    }
}

/// Encoded input plus output, in MB, floored at 0.1 MB.
fn estimate_memory_mb(n_records: usize, encoded_width: usize) -> f64 {
    let bytes = n_records * (encoded_width + 1) * std::mem::size_of::<f64>();
    (bytes as f64 / BYTES_PER_MB).max(MIN_MEMORY_MB)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_estimate_has_a_floor() {
        assert_eq!(estimate_memory_mb(1, 4), MIN_MEMORY_MB);
        assert_eq!(estimate_memory_mb(0, 0), MIN_MEMORY_MB);
    }

    #[test]
    fn memory_estimate_scales_with_batch() {
        // 1000 records x 131071 columns + 1 output column of f64
        let mb = estimate_memory_mb(1000, 131_071);
        assert!((mb - 1000.0).abs() < 1e-9);
    }
}
