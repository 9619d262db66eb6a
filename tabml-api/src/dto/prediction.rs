use serde::{Deserialize, Serialize};
use tabml_core::{ApiMetrics, Record, Scalar};

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictRequest {
    pub features: Record,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: Scalar,
    pub response_time_ms: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchPredictRequest {
    pub records: Vec<Record>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchPredictResponse {
    pub predictions: Vec<Scalar>,
    pub count: usize,
    pub response_time_ms: f64,
    pub metrics: ApiMetrics,
}
