//! Scheduler and reminder-engine errors.

use practice_domain::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid date format: {0}")]
    InvalidDate(String),

    #[error("store error: {0}")]
    Store(#[from] practice_store::StoreError),

    #[error("domain error: {0}")]
    Domain(#[from] EngineError),

    #[error("delivery failed on channel {channel}: {message}")]
    DeliveryFailed { channel: String, message: String },
}

impl From<SchedulerError> for EngineError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::InvalidDate(msg) => EngineError::Validation(msg),
            SchedulerError::Store(e) => e.into(),
            SchedulerError::Domain(e) => e,
            SchedulerError::DeliveryFailed { channel, message } => {
                EngineError::Backend(format!("delivery failed on {channel}: {message}"))
            }
        }
    }
}
