use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ModelId, TrainingRunId};
use super::task::{Algorithm, TaskType};

// ===== Candidate Metrics =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ConfusionMatrix {
    pub labels: Vec<String>,
    pub matrix: Vec<Vec<u64>>, // matrix[actual][predicted]
}

impl ConfusionMatrix {
    pub fn shape(&self) -> (usize, usize) {
        (
            self.matrix.len(),
            self.matrix.first().map(Vec::len).unwrap_or(0),
        )
    }

    pub fn total(&self) -> u64 {
        self.matrix.iter().flatten().sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion_matrix: ConfusionMatrix,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub mae: f64,
    pub r2: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CandidateMetrics {
    Classification(ClassificationMetrics),
    Regression(RegressionMetrics),
}

impl CandidateMetrics {
    pub fn as_classification(&self) -> Option<&ClassificationMetrics> {
        match self {
            CandidateMetrics::Classification(m) => Some(m),
            CandidateMetrics::Regression(_) => None,
        }
    }

    pub fn as_regression(&self) -> Option<&RegressionMetrics> {
        match self {
            CandidateMetrics::Regression(m) => Some(m),
            CandidateMetrics::Classification(_) => None,
        }
    }
}

// ===== Candidate Result =====

/// One algorithm's outcome within a training run. A candidate that failed to
/// fit carries `metrics: None` and the failure message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateResult {
    pub algorithm: Algorithm,
    pub metrics: Option<CandidateMetrics>,
    pub artifact_path: Option<String>,
    pub version: Option<u64>,
    pub training_time_ms: f64,
    pub error: Option<String>,
}

impl CandidateResult {
    pub fn succeeded(&self) -> bool {
        self.metrics.is_some()
    }
}

// ===== Training Run =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingRun {
    pub id: TrainingRunId,
    pub model_id: ModelId,
    pub task: TaskType,
    pub target_column: String,
    pub feature_columns: Vec<String>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub candidates: Vec<CandidateResult>,
    pub best_algorithm: Algorithm,
    pub justification: String,
    pub best_artifact_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TrainingRun {
    pub fn candidate(&self, algorithm: Algorithm) -> Option<&CandidateResult> {
        self.candidates.iter().find(|c| c.algorithm == algorithm)
    }

    pub fn best(&self) -> Option<&CandidateResult> {
        self.candidate(self.best_algorithm)
    }

    pub fn successful_candidates(&self) -> impl Iterator<Item = &CandidateResult> {
        self.candidates.iter().filter(|c| c.succeeded())
    }
}
