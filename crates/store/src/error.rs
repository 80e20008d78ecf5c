//! Storage-layer errors, folded into the shared taxonomy at the boundary.

use practice_domain::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("version conflict: expected {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },

    #[error("integrity check failed for key {0}")]
    IntegrityFailure(String),

    #[error("decryption failed for key {0}")]
    DecryptionFailure(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Backend(msg) => EngineError::Backend(msg),
            StoreError::VersionConflict { expected, found } => {
                EngineError::VersionConflict { expected, found }
            }
            StoreError::IntegrityFailure(key) => EngineError::IntegrityFailure(key),
            StoreError::DecryptionFailure(key) => EngineError::DecryptionFailure(key),
            StoreError::InvalidData(msg) => EngineError::Validation(msg),
            StoreError::NotFound(key) => EngineError::NotFound(key),
            StoreError::Serde(err) => EngineError::Validation(err.to_string()),
        }
    }
}
