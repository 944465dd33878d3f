//! Error types for synchronization

use std::path::PathBuf;

use optsync_reconcile::ShapeError;
use optsync_store::StoreError;

/// Errors from one synchronization pass
///
/// Shape conflicts are not errors here: they are reported as
/// [`SyncOutcome::Conflict`](crate::SyncOutcome::Conflict).
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The settings store failed
    #[error("settings store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// Every compare-and-swap attempt lost to another writer
    #[error("record '{key}' kept changing underneath us ({attempts} attempts)")]
    Contended {
        /// Record key
        key: String,
        /// Write attempts made
        attempts: u32,
    },
}

/// Errors loading a shape file
#[derive(Debug, thiserror::Error)]
pub enum ShapeFileError {
    /// File could not be read
    #[error("failed to read shape file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying failure
        source: std::io::Error,
    },

    /// Extension names no supported format
    #[error("unsupported shape file format: {0} (expected .yaml, .yml, .json or .toml)")]
    UnknownFormat(PathBuf),

    /// Document did not parse
    #[error("failed to parse shape file {path}: {reason}")]
    Parse {
        /// File path, or `<inline>` for text
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Document parsed but declares an invalid shape
    #[error("invalid shape in {path}: {source}")]
    Invalid {
        /// File path, or `<inline>` for text
        path: PathBuf,
        /// Validation failure
        source: ShapeError,
    },
}

/// Errors loading [`SyncConfig`](crate::SyncConfig)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying failure
        source: std::io::Error,
    },

    /// TOML did not parse
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}
