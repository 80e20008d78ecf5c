//! Provider cache errors.

use practice_domain::EngineError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum CacheError {
    #[error("fetch failed for {key}: {message}")]
    FetchFailed { key: String, message: String },
}

impl CacheError {
    pub fn fetch_failed(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl From<CacheError> for EngineError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::FetchFailed { key, message } => {
                EngineError::Backend(format!("provider fetch failed for {key}: {message}"))
            }
        }
    }
}
