//! Synchronizer configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default compare-and-swap retries per pass
pub const DEFAULT_MAX_CAS_RETRIES: u32 = 3;

/// Tuning for a [`Synchronizer`](crate::Synchronizer)
///
/// ```toml
/// max_cas_retries = 5
/// dry_run = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Extra attempts after a lost compare-and-swap
    pub max_cas_retries: u32,
    /// Reconcile and report, but never write
    pub dry_run: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_cas_retries: DEFAULT_MAX_CAS_RETRIES,
            dry_run: false,
        }
    }
}

impl SyncConfig {
    /// Parse from TOML text; missing fields take defaults
    ///
    /// # Errors
    /// Returns [`ConfigError::Toml`] on malformed input or unknown fields
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Same settings with dry run switched on or off
    #[inline]
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(SyncConfig::from_toml_str("").unwrap(), SyncConfig::default());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SyncConfig::from_toml_str("dry_run = true").unwrap();
        assert!(config.dry_run);
        assert_eq!(config.max_cas_retries, DEFAULT_MAX_CAS_RETRIES);
    }

    #[test]
    fn unknown_field_rejected() {
        assert!(SyncConfig::from_toml_str("retries = 2").is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SyncConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
