use thiserror::Error;

/// Errors raised by the baseline and peak routines.
///
/// Only caller contract violations abort a computation; numerically degenerate
/// spectra are handled inside the algorithms and never surface here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RamanError {
    /// Inputs violate a documented precondition (length mismatch, too few samples,
    /// non-finite values or out-of-range parameters).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The banded LDLᵀ factorization met a non-positive pivot.
    #[error("matrix is not positive definite (pivot {index})")]
    NotPositiveDefinite { index: usize },

    /// The worker pool for batch processing could not be created.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}

impl RamanError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        RamanError::InvalidInput(msg.into())
    }
}
