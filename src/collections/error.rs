use std::time::Duration;
use thiserror::Error;

/// Failure of a collection operation, classified by who is at fault.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// A required field is missing or malformed. Nothing was written.
    #[error("{0}")]
    Validation(String),

    /// The referenced collection does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The operation did not finish within the request timeout. Any write in
    /// progress was rolled back.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Store or runtime failure.
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl CollectionError {
    pub fn validation(detail: impl std::fmt::Display) -> Self {
        CollectionError::Validation(format!("Invalid input data: {}", detail))
    }

    /// Short outcome label, used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CollectionError::Validation(_) => "validation_error",
            CollectionError::NotFound(_) => "not_found",
            CollectionError::Timeout(_) => "timeout",
            CollectionError::Internal(_) => "internal_error",
        }
    }
}
