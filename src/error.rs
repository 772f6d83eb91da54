//! Error types for the modeling pipeline.

use thiserror::Error;

/// Errors raised by the modeling core. Two kinds only, both fail-fast:
/// no operation partially mutates state on failure.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Malformed input: empty training data, wrong feature dimensionality.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A read operation was invoked before a successful `fit`.
    #[error("model is not fitted")]
    NotFitted,
}

pub type Result<T> = std::result::Result<T, ModelError>;
