use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{CoreError, Result};

// ===== Training Configuration =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation.
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub test_fraction: f64,
    pub random_seed: u64,
    #[validate(range(min = 2))]
    pub min_rows: usize,
    /// Targets with at most this many distinct values are advised as classification.
    #[validate(range(min = 2))]
    pub classification_cardinality_threshold: usize,
    #[validate(range(min = 1))]
    pub max_concurrent_runs: usize,
    #[validate(range(min = 1))]
    pub n_trees: usize,
    #[validate(range(min = 1))]
    pub max_depth: usize,
    #[validate(range(min = 2))]
    pub min_samples_split: usize,
    #[validate(range(min = 1))]
    pub boosting_rounds: usize,
    #[validate(range(exclusive_min = 0.0))]
    pub learning_rate: f64,
    #[validate(range(min = 1))]
    pub max_iter: usize,
    #[validate(range(min = 0.0))]
    pub ridge_alpha: f64,
    #[validate(range(min = 0.0))]
    pub lasso_alpha: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub svm_lambda: f64,
    /// Categorical levels one-hot encoded per column; rarer levels share an
    /// `__other__` column.
    #[validate(range(min = 1))]
    pub max_categories: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            random_seed: 42,
            min_rows: 10,
            classification_cardinality_threshold: 20,
            max_concurrent_runs: 4,
            n_trees: 50,
            max_depth: 8,
            min_samples_split: 2,
            boosting_rounds: 60,
            learning_rate: 0.1,
            max_iter: 500,
            ridge_alpha: 1.0,
            lasso_alpha: 0.01,
            svm_lambda: 0.01,
            max_categories: 50,
        }
    }
}

// ===== Serving Configuration =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct ServingConfig {
    #[validate(range(min = 1))]
    pub max_batch_size: usize,
    /// Maximum number of loaded artifacts kept in memory.
    #[validate(range(min = 1))]
    pub cache_capacity: usize,
    /// Upper bound on usage events returned by a history query.
    #[validate(range(min = 1))]
    pub usage_history_limit: usize,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 1000,
            cache_capacity: 64,
            usage_history_limit: 500,
        }
    }
}

// ===== Storage Configuration =====

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct StorageConfig {
    #[validate(length(min = 1))]
    pub artifact_root: String,
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    #[validate(range(min = 1))]
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            artifact_root: "artifacts".to_string(),
            backend: StorageBackend::Memory,
            database_url: None,
            max_connections: 10,
        }
    }
}

// ===== Platform Configuration =====

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct PlatformConfig {
    #[validate(nested)]
    pub training: TrainingConfig,
    #[validate(nested)]
    pub serving: ServingConfig,
    #[validate(nested)]
    pub storage: StorageConfig,
}

impl PlatformConfig {
    /// Validate every section, reporting the first failure as a core error.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| CoreError::Validation(format!("invalid configuration: {}", e)))?;
        if self.storage.backend == StorageBackend::Postgres && self.storage.database_url.is_none() {
            return Err(CoreError::Validation(
                "storage.database_url is required for the postgres backend".to_string(),
            ));
        }
        Ok(())
    }
}
