//! Translation boundary errors

use crate::types::PostId;

/// Errors from translation operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    /// The translation backend is not installed or not active
    #[error("translation backend '{0}' is not available")]
    DependencyUnavailable(String),

    /// Request is malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Content item does not exist
    #[error("post {0} not found")]
    NotFound(PostId),
}

impl TranslationError {
    /// Stable machine-readable code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DependencyUnavailable(_) => "dependency_unavailable",
            Self::InvalidRequest(_) => "invalid_request",
            Self::NotFound(_) => "not_found",
        }
    }

    /// HTTP status a transport layer should map this to
    #[must_use]
    pub fn status_hint(&self) -> u16 {
        match self {
            Self::DependencyUnavailable(_) => 503,
            Self::InvalidRequest(_) => 400,
            Self::NotFound(_) => 404,
        }
    }
}
