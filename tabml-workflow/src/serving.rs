use std::sync::Arc;

use dashmap::DashMap;
use tabml_core::{CoreError, Record, Result, Scalar, ServingConfig};
use tabml_ml::artifact::ModelArtifact;
use tabml_storage::ArtifactRegistry;
use tracing::debug;

/// Predictions for one batch plus what it took to produce them.
#[derive(Debug, Clone)]
pub struct BatchPrediction {
    pub predictions: Vec<Scalar>,
    /// Width of the encoded feature matrix.
    pub encoded_width: usize,
}

/// Loads artifacts through the registry and runs inference.
///
/// Loaded artifacts are immutable and cached by path; a retrained model
/// publishes a new path, so entries never go stale.
pub struct PredictionService {
    registry: Arc<ArtifactRegistry>,
    cache: DashMap<String, Arc<ModelArtifact>>,
    config: ServingConfig,
}

impl PredictionService {
    pub fn new(registry: Arc<ArtifactRegistry>, config: ServingConfig) -> Self {
        Self {
            registry,
            cache: DashMap::new(),
            config,
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.config.max_batch_size
    }

    /// Fetch an artifact, loading it on a cache miss.
    pub fn artifact(&self, path: &str) -> Result<Arc<ModelArtifact>> {
        if let Some(hit) = self.cache.get(path) {
            debug!(path, "Artifact cache hit");
            return Ok(Arc::clone(hit.value()));
        }

        debug!(path, "Artifact cache miss");
        let artifact = Arc::new(self.registry.load(path)?);
        if self.cache.len() >= self.config.cache_capacity {
            let evict = self.cache.iter().next().map(|entry| entry.key().clone());
            if let Some(key) = evict {
                self.cache.remove(&key);
            }
        }
        self.cache.insert(path.to_string(), Arc::clone(&artifact));
        Ok(artifact)
    }

    /// One prediction per record, in input order. Blocking.
    pub fn predict(&self, path: &str, records: &[Record]) -> Result<BatchPrediction> {
        if records.len() > self.config.max_batch_size {
            return Err(CoreError::BatchTooLarge {
                size: records.len(),
                max: self.config.max_batch_size,
            });
        }

        let artifact = self.artifact(path)?;
        let predictions = artifact.predict(records)?;
        Ok(BatchPrediction {
            predictions,
            encoded_width: artifact.preprocessor.output_width(),
        })
    }
}
