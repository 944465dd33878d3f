//! Directory-of-JSON-files settings store
//!
//! Each record lives in `<root>/<key>.json`. Writes go to a hidden
//! temporary file that is then renamed over the record, so readers never
//! observe a partial write. Blocking I/O runs on tokio's blocking pool.

use std::fs;
use std::io::{self, ErrorKind, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use optsync_blob::{ConfigBlob, Revision, Value};
use parking_lot::Mutex;

use crate::error::{validate_key, StoreError};
use crate::SettingsStore;

const EXTENSION: &str = "json";

/// Settings store backed by a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    root: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed
    ///
    /// # Errors
    /// Returns [`StoreError::Unavailable`] if the directory cannot be created
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| StoreError::unavailable(&root.display().to_string(), e))?;
        tracing::debug!(root = %root.display(), "opened file store");
        Ok(Self {
            inner: Arc::new(Inner {
                root,
                locks: DashMap::new(),
            }),
        })
    }

    /// Directory holding the records
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    async fn blocking<T, F>(&self, key: &str, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> Result<T, StoreError> + Send + 'static,
    {
        validate_key(key)?;
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&inner))
            .await
            .map_err(|e| StoreError::unavailable(key, io::Error::other(e)))?
    }
}

impl Inner {
    fn path_of(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.{EXTENSION}"))
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(key.to_owned()).or_default().value())
    }

    fn read(&self, key: &str) -> Result<Option<ConfigBlob>, StoreError> {
        let text = match fs::read_to_string(self.path_of(key)) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::unavailable(key, e)),
        };
        let value: Value =
            serde_json::from_str(&text).map_err(|e| StoreError::corrupt(key, e))?;
        ConfigBlob::from_value(value)
            .map(Some)
            .map_err(|e| StoreError::corrupt(key, e))
    }

    fn write(&self, key: &str, blob: &ConfigBlob) -> Result<(), StoreError> {
        let json = blob
            .to_json_pretty()
            .map_err(|e| StoreError::corrupt(key, e))?;
        let tmp = self.root.join(format!(".{key}.{EXTENSION}.tmp"));

        let result = fs::File::create(&tmp)
            .and_then(|mut file| {
                file.write_all(json.as_bytes())?;
                file.write_all(b"\n")?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&tmp, self.path_of(key)));

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::unavailable(key, e));
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<ConfigBlob>, StoreError> {
        let owned = key.to_owned();
        self.blocking(key, move |inner| inner.read(&owned)).await
    }

    async fn set(&self, key: &str, blob: &ConfigBlob) -> Result<(), StoreError> {
        let owned = key.to_owned();
        let blob = blob.clone();
        self.blocking(key, move |inner| {
            let lock = inner.lock_for(&owned);
            let _guard = lock.lock();
            inner.write(&owned, &blob)?;
            tracing::debug!(key = %owned, "record written");
            Ok(())
        })
        .await
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<Revision>,
        blob: &ConfigBlob,
    ) -> Result<bool, StoreError> {
        let owned = key.to_owned();
        let blob = blob.clone();
        self.blocking(key, move |inner| {
            let lock = inner.lock_for(&owned);
            let _guard = lock.lock();
            let current = inner.read(&owned)?.map(|b| b.revision());
            if current != expected {
                tracing::debug!(key = %owned, "compare-and-set lost");
                return Ok(false);
            }
            inner.write(&owned, &blob)?;
            Ok(true)
        })
        .await
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let root = inner.root.display().to_string();
            let entries = fs::read_dir(&inner.root).map_err(|e| StoreError::unavailable(&root, e))?;
            let mut keys = Vec::new();
            for entry in entries {
                let path = entry.map_err(|e| StoreError::unavailable(&root, e))?.path();
                if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if validate_key(stem).is_ok() {
                        keys.push(stem.to_owned());
                    }
                }
            }
            keys.sort();
            Ok(keys)
        })
        .await
        .map_err(|e| StoreError::unavailable("*", io::Error::other(e)))?
    }
}
