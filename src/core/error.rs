use thiserror::Error;

/// Errors raised by the aggregation core.
///
/// `Validation` means a malformed detection reached ingestion and was
/// rejected rather than clamped; the caller decides whether to drop it or
/// abort. `Sequence` indicates a driver bug and is fatal to the run.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid detection: {reason}")]
    Validation { reason: String },

    #[error("page {got} out of sequence (expected {expected})")]
    Sequence { expected: usize, got: usize },
}

impl CoreError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }
}
