//! The `error` module defines the error type returned by timer operations.
//!
//! Only caller mistakes surface as errors. Delivery failures towards a
//! subscriber are handled inside the registry by dropping that subscriber and
//! never reach the caller.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    /// The request was rejected before any state was touched.
    #[error("{0}")]
    InvalidArgument(String),
}

impl TimerError {
    pub fn missing_timer_id() -> Self {
        Self::InvalidArgument("timerId is required".to_string())
    }

    pub fn invalid_duration(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(format!("invalid duration: {}", reason.into()))
    }
}

/// Rejects empty timer identifiers.
pub fn require_timer_id(id: &str) -> Result<&str, TimerError> {
    if id.is_empty() {
        Err(TimerError::missing_timer_id())
    } else {
        Ok(id)
    }
}
