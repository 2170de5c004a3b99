//! Error taxonomy shared by every [`PageStore`](crate::store::PageStore)
//! backend.
//!
//! The machine-readable [`code`](StoreError::code) strings double as the
//! HTTP error contract, so a remote client can rebuild the same variant from
//! an error response with [`StoreError::from_code`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The request was missing `content` or carried a malformed body.
    #[error("validation error: {0}")]
    Validation(String),

    /// The id is well formed but no page exists under it.
    #[error("page not found: {0}")]
    NotFound(String),

    /// The id is not a well-formed page identifier.
    #[error("invalid page id: {0}")]
    InvalidId(String),

    /// The backing store could not be reached. Safe to retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Validation(_) => "validation",
            StoreError::NotFound(_) => "not_found",
            StoreError::InvalidId(_) => "invalid_id",
            StoreError::Unavailable(_) => "unavailable",
            StoreError::Internal(_) => "internal",
        }
    }

    /// Rebuilds an error from a code/message pair. Unknown codes map to
    /// [`StoreError::Internal`].
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "validation" => StoreError::Validation(message),
            "not_found" => StoreError::NotFound(message),
            "invalid_id" => StoreError::InvalidId(message),
            "unavailable" => StoreError::Unavailable(message),
            _ => StoreError::Internal(message),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
