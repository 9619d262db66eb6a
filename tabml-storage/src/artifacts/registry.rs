use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tabml_core::{Algorithm, ArtifactRef, CoreError, ModelId, Result};
use tabml_ml::artifact::{ModelArtifact, ARTIFACT_SCHEMA_VERSION};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::metadata::{format_file_size, ArtifactHeader};

const EXTENSION: &str = "json";

/// Filesystem registry of trained artifacts.
///
/// Artifacts live at `{root}/{model_id}/{algorithm}_v{version}.json`. Versions
/// are allocated per model under a per-model lock and never reused, and a
/// published file is never replaced.
pub struct ArtifactRegistry {
    root: PathBuf,
    /// `None` until the model's directory has been scanned for prior versions.
    counters: DashMap<ModelId, Arc<Mutex<Option<u64>>>>,
}

impl ArtifactRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        info!(root = %root.display(), "Artifact registry ready");
        Ok(Self {
            root,
            counters: DashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, model_id: &ModelId, algorithm: Algorithm, version: u64) -> PathBuf {
        self.root
            .join(model_id.to_string())
            .join(format!("{}_v{}.{}", algorithm.as_str(), version, EXTENSION))
    }

    /// Reserve the next version number for `model_id`.
    pub fn allocate_version(&self, model_id: &ModelId) -> Result<u64> {
        let counter = self
            .counters
            .entry(*model_id)
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();

        let mut guard = counter
            .lock()
            .map_err(|_| CoreError::Internal(format!("version counter for {} poisoned", model_id)))?;
        let current = match *guard {
            Some(current) => current,
            None => self.highest_version(model_id)?,
        };
        let next = current + 1;
        *guard = Some(next);

        debug!(model_id = %model_id, version = next, "Allocated artifact version");
        Ok(next)
    }

    /// Publish `artifact` under a version obtained from [`allocate_version`].
    /// The file appears complete or not at all.
    ///
    /// [`allocate_version`]: ArtifactRegistry::allocate_version
    pub fn save(&self, model_id: &ModelId, version: u64, artifact: &ModelArtifact) -> Result<ArtifactRef> {
        let path = self.path_for(model_id, artifact.algorithm, version);
        let dir = path
            .parent()
            .ok_or_else(|| CoreError::Internal(format!("artifact path {} has no parent", path.display())))?;
        fs::create_dir_all(dir)?;

        let payload = serde_json::to_vec(artifact)?;
        let header = ArtifactHeader::new(
            ARTIFACT_SCHEMA_VERSION,
            *model_id,
            artifact.algorithm,
            version,
            &payload,
        );
        let bytes = header.encode(&payload)?;

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&bytes)?;
        file.as_file().sync_all()?;
        file.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == ErrorKind::AlreadyExists {
                CoreError::AlreadyExists(format!("artifact {}", path.display()))
            } else {
                CoreError::Io(e.error.to_string())
            }
        })?;

        info!(
            model_id = %model_id,
            algorithm = %artifact.algorithm,
            version,
            size = %format_file_size(bytes.len() as u64),
            "Published artifact"
        );

        Ok(ArtifactRef {
            model_id: *model_id,
            algorithm: artifact.algorithm,
            version,
            path: path.to_string_lossy().into_owned(),
        })
    }

    /// Read an artifact back. Missing files and incompatible schema versions
    /// are `ArtifactNotFound`; checksum failures are `ArtifactCorrupted`.
    pub fn load(&self, path: &str) -> Result<ModelArtifact> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CoreError::ArtifactNotFound(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let (header, payload) = ArtifactHeader::decode(&bytes)?;
        if header.schema_version != ARTIFACT_SCHEMA_VERSION {
            return Err(CoreError::ArtifactNotFound(format!(
                "{} has schema version {}, expected {}",
                path, header.schema_version, ARTIFACT_SCHEMA_VERSION
            )));
        }
        if !header.verify_checksum(payload) {
            return Err(CoreError::ArtifactCorrupted(format!("checksum mismatch for {}", path)));
        }

        let artifact: ModelArtifact = serde_json::from_slice(payload)
            .map_err(|e| CoreError::ArtifactCorrupted(format!("{}: {}", path, e)))?;
        if !artifact.is_compatible() {
            return Err(CoreError::ArtifactNotFound(format!(
                "{} declares incompatible schema version {}",
                path, artifact.schema_version
            )));
        }
        Ok(artifact)
    }

    /// Versions already published for `model_id`, ascending.
    pub fn versions(&self, model_id: &ModelId) -> Result<Vec<u64>> {
        let dir = self.root.join(model_id.to_string());
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            if let Some(version) = name.to_str().and_then(parse_version) {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        versions.dedup();
        Ok(versions)
    }

    fn highest_version(&self, model_id: &ModelId) -> Result<u64> {
        Ok(self.versions(model_id)?.last().copied().unwrap_or(0))
    }
}

/// `random_forest_classifier_v12.json` -> `12`
fn parse_version(file_name: &str) -> Option<u64> {
    let stem = file_name.strip_suffix(EXTENSION)?.strip_suffix('.')?;
    let (_, version) = stem.rsplit_once("_v")?;
    version.parse().ok()
}
