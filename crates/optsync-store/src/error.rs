//! Store error types

use std::io;

/// Errors from a settings store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backing storage could not be read or written
    #[error("store unavailable for '{key}': {source}")]
    Unavailable {
        /// Record key being accessed
        key: String,
        /// Underlying I/O failure
        source: io::Error,
    },

    /// Stored record is not a JSON mapping
    #[error("record '{key}' is corrupt: {reason}")]
    Corrupt {
        /// Record key
        key: String,
        /// What failed to parse
        reason: String,
    },

    /// Key cannot name a record
    #[error("invalid record key '{key}': {reason}")]
    InvalidKey {
        /// Rejected key
        key: String,
        /// Why it was rejected
        reason: &'static str,
    },
}

impl StoreError {
    /// Record key the error refers to
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Unavailable { key, .. }
            | Self::Corrupt { key, .. }
            | Self::InvalidKey { key, .. } => key,
        }
    }

    pub(crate) fn unavailable(key: &str, source: io::Error) -> Self {
        Self::Unavailable {
            key: key.to_owned(),
            source,
        }
    }

    pub(crate) fn corrupt(key: &str, reason: impl ToString) -> Self {
        Self::Corrupt {
            key: key.to_owned(),
            reason: reason.to_string(),
        }
    }
}

/// Reject keys that cannot safely name a record
///
/// Keys must be non-empty, must not start with `.`, and must not contain
/// path separators or NUL.
///
/// # Errors
/// Returns [`StoreError::InvalidKey`] describing the first violation
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key.starts_with('.') {
        "key starts with '.'"
    } else if key.contains(['/', '\\']) {
        "key contains a path separator"
    } else if key.contains('\0') {
        "key contains NUL"
    } else {
        return Ok(());
    };
    Err(StoreError::InvalidKey {
        key: key.to_owned(),
        reason,
    })
}
