//! optsync Settings Store
//!
//! The persistence boundary: records addressed by string key, read and
//! written whole. Writers coordinate through [`SettingsStore::compare_and_set`],
//! keyed on the record's content [`Revision`].
//!
//! # Implementations
//!
//! - [`MemoryStore`]: concurrent in-process map
//! - [`FileStore`]: one JSON file per record in a directory

#![warn(unreachable_pub)]
#![warn(missing_docs)]

use std::sync::Arc;

use async_trait::async_trait;
use optsync_blob::{ConfigBlob, Revision};

mod error;
mod file;
mod memory;

pub use error::{validate_key, StoreError};
pub use file::FileStore;
pub use memory::MemoryStore;

/// Keyed settings persistence
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch a record, `None` if absent
    ///
    /// # Errors
    /// Returns [`StoreError`] if the key is invalid, storage fails, or the
    /// record is not a mapping
    async fn get(&self, key: &str) -> Result<Option<ConfigBlob>, StoreError>;

    /// Replace a record unconditionally
    ///
    /// # Errors
    /// Returns [`StoreError`] if the key is invalid or storage fails
    async fn set(&self, key: &str, blob: &ConfigBlob) -> Result<(), StoreError>;

    /// Replace a record only if its revision is still `expected`
    ///
    /// `expected == None` means the record must be absent. Returns whether
    /// the write happened.
    ///
    /// # Errors
    /// Returns [`StoreError`] if the key is invalid or storage fails
    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<Revision>,
        blob: &ConfigBlob,
    ) -> Result<bool, StoreError>;

    /// Keys of all stored records, sorted
    ///
    /// # Errors
    /// Returns [`StoreError`] if storage cannot be listed
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Revision of a record, `None` if absent
    ///
    /// # Errors
    /// See [`SettingsStore::get`]
    async fn revision(&self, key: &str) -> Result<Option<Revision>, StoreError> {
        Ok(self.get(key).await?.map(|blob| blob.revision()))
    }
}

#[async_trait]
impl<S: SettingsStore + ?Sized> SettingsStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<ConfigBlob>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, blob: &ConfigBlob) -> Result<(), StoreError> {
        (**self).set(key, blob).await
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<Revision>,
        blob: &ConfigBlob,
    ) -> Result<bool, StoreError> {
        (**self).compare_and_set(key, expected, blob).await
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        (**self).keys().await
    }

    async fn revision(&self, key: &str) -> Result<Option<Revision>, StoreError> {
        (**self).revision(key).await
    }
}
