use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Malformed dataset: {0}")]
    MalformedDataset(String),

    #[error("Insufficient class samples: {0}")]
    InsufficientClassSamples(String),

    #[error("All candidates failed: {0}")]
    AllCandidatesFailed(String),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Artifact corrupted: {0}")]
    ArtifactCorrupted(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Invalid value {value:?} for feature '{key}'")]
    InvalidFeatureValue { key: String, value: String },

    #[error("Batch too large: {size} records exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl CoreError {
    /// True for errors caused by the caller's input rather than the platform.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CoreError::MalformedDataset(_)
                | CoreError::InsufficientClassSamples(_)
                | CoreError::SchemaMismatch(_)
                | CoreError::InvalidFeatureValue { .. }
                | CoreError::BatchTooLarge { .. }
                | CoreError::Validation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(feature = "database")]
impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err.to_string())
    }
}
