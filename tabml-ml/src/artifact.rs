use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabml_core::{Algorithm, CoreError, Record, Result, Scalar, TaskType};

use crate::estimators::FittedEstimator;
use crate::preprocessing::{Preprocessor, TargetEncoder};

/// Version of the artifact layout understood by this build. Artifacts
/// declaring any other version are refused at load time.
pub const ARTIFACT_SCHEMA_VERSION: u32 = 1;

/// One persisted unit: the fitted preprocessing, the fitted estimator and the
/// target decoding, always stored and loaded together.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub schema_version: u32,
    pub algorithm: Algorithm,
    pub task: TaskType,
    pub target_column: String,
    pub preprocessor: Preprocessor,
    pub target: TargetEncoder,
    pub estimator: FittedEstimator,
    pub trained_at: DateTime<Utc>,
}

impl ModelArtifact {
    pub fn new(
        task: TaskType,
        target_column: String,
        preprocessor: Preprocessor,
        target: TargetEncoder,
        estimator: FittedEstimator,
    ) -> Self {
        Self {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            algorithm: estimator.algorithm(),
            task,
            target_column,
            preprocessor,
            target,
            estimator,
            trained_at: Utc::now(),
        }
    }

    pub fn is_compatible(&self) -> bool {
        self.schema_version == ARTIFACT_SCHEMA_VERSION
    }

    pub fn feature_columns(&self) -> Vec<String> {
        self.preprocessor.feature_columns()
    }

    /// Predict one value per record, in input order. Records must carry
    /// exactly the feature columns the preprocessing was fit on.
    pub fn predict(&self, records: &[Record]) -> Result<Vec<Scalar>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let x = self.preprocessor.transform_records(records)?;
        let raw = self
            .estimator
            .predict(&x)
            .map_err(|e| CoreError::Internal(format!("{} inference failed: {}", self.algorithm, e)))?;
        Ok(raw.iter().map(|&v| self.target.decode(v)).collect())
    }
}
