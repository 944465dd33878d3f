//! In-memory settings store

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use optsync_blob::{ConfigBlob, Revision};

use crate::error::{validate_key, StoreError};
use crate::SettingsStore;

/// Settings store held in a concurrent map
///
/// Compare-and-swap runs under the map's entry lock, so it is atomic with
/// respect to every other operation on the same key.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, ConfigBlob>,
}

impl MemoryStore {
    /// Empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with records
    #[must_use]
    pub fn with_records<K: Into<String>>(records: impl IntoIterator<Item = (K, ConfigBlob)>) -> Self {
        Self {
            records: records.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Number of records held
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<ConfigBlob>, StoreError> {
        validate_key(key)?;
        Ok(self.records.get(key).map(|r| r.value().clone()))
    }

    async fn set(&self, key: &str, blob: &ConfigBlob) -> Result<(), StoreError> {
        validate_key(key)?;
        self.records.insert(key.to_owned(), blob.clone());
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<Revision>,
        blob: &ConfigBlob,
    ) -> Result<bool, StoreError> {
        validate_key(key)?;
        match self.records.entry(key.to_owned()) {
            Entry::Occupied(mut entry) => {
                if expected != Some(entry.get().revision()) {
                    return Ok(false);
                }
                entry.insert(blob.clone());
            }
            Entry::Vacant(entry) => {
                if expected.is_some() {
                    return Ok(false);
                }
                entry.insert(blob.clone());
            }
        }
        Ok(true)
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.records.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blob(value: serde_json::Value) -> ConfigBlob {
        ConfigBlob::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn set_then_get() {
        let store = MemoryStore::new();
        let record = blob(json!({"layout": {"default": "right-sidebar"}}));

        store.set("theme", &record).await.unwrap();
        assert_eq!(store.get("theme").await.unwrap(), Some(record));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn cas_rejects_stale_revision() {
        let store = MemoryStore::new();
        let first = blob(json!({"v": 1}));
        let second = blob(json!({"v": 2}));

        assert!(store.compare_and_set("k", None, &first).await.unwrap());
        assert!(!store.compare_and_set("k", None, &second).await.unwrap());

        let stale = Revision::compute(b"stale");
        assert!(!store.compare_and_set("k", Some(stale), &second).await.unwrap());

        let current = store.revision("k").await.unwrap();
        assert!(store.compare_and_set("k", current, &second).await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn cas_on_absent_record_with_expected_fails() {
        let store = MemoryStore::new();
        let rev = blob(json!({})).revision();
        assert!(!store.compare_and_set("k", Some(rev), &blob(json!({}))).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn keys_are_sorted() {
        let store = MemoryStore::with_records([("b", ConfigBlob::new()), ("a", ConfigBlob::new())]);
        assert_eq!(store.keys().await.unwrap(), vec!["a", "b"]);
    }
}
