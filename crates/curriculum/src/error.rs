//! Curriculum structurer and entity resolver errors (spec §4.6, §4.7).

use practice_domain::EngineError;
use thiserror::Error;

/// Hard terminal errors never retry (spec §4.6 "Hard terminal errors").
#[derive(Debug, Error)]
pub enum CurriculumError {
    #[error("no resources supplied")]
    NoResources,

    #[error("invalid day count: {0}")]
    InvalidDays(u32),

    #[error("llm client not initialized")]
    ClientNotInitialized,

    #[error("llm client rejected the request: {0}")]
    ClientRejected(String),

    #[error("curriculum generation failed after {attempts} attempts: {last_error}")]
    GenerationFailed { attempts: u32, last_error: String },
}

impl From<CurriculumError> for EngineError {
    fn from(err: CurriculumError) -> Self {
        match err {
            CurriculumError::NoResources => EngineError::Validation("NO_RESOURCES".to_string()),
            CurriculumError::InvalidDays(n) => {
                EngineError::Validation(format!("INVALID_DAYS: {n}"))
            }
            CurriculumError::ClientNotInitialized => {
                EngineError::Validation("CLIENT_NOT_INITIALIZED".to_string())
            }
            CurriculumError::ClientRejected(msg) => EngineError::Validation(msg),
            CurriculumError::GenerationFailed { last_error, .. } => {
                EngineError::GenerationFailed(last_error)
            }
        }
    }
}

/// A single retryable parse/validation failure, accumulated across attempts
/// until `max_retries` is exhausted, at which point the last one becomes
/// the `GENERATION_FAILED` message (spec §4.6 step 4-8).
#[derive(Debug, Clone)]
pub enum ValidationFailure {
    SchemaMismatch(String),
    InvalidResourceIndices(Vec<usize>),
    DaySequenceGap { expected: u32, found: Vec<u32> },
    PrerequisiteNotBefore { day: u32, prerequisite: u32 },
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationFailure::SchemaMismatch(msg) => write!(f, "schema mismatch: {msg}"),
            ValidationFailure::InvalidResourceIndices(idxs) => {
                write!(f, "Invalid resource indices: {idxs:?}")
            }
            ValidationFailure::DaySequenceGap { expected, found } => write!(
                f,
                "day sequence must be 1..{expected} without gaps, found {found:?}"
            ),
            ValidationFailure::PrerequisiteNotBefore { day, prerequisite } => write!(
                f,
                "day {day} names prerequisite day {prerequisite}, which is not before it"
            ),
        }
    }
}
