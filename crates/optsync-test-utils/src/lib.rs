//! Testing utilities for the optsync workspace
//!
//! Shared fixtures and instrumented stores.

#![allow(missing_docs)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use optsync_blob::{ConfigBlob, Revision, ShapePath, Value};
use optsync_reconcile::{DesiredShape, FixedClock, FreshnessMarker, Reconciler, ShapeRule};
use optsync_store::{MemoryStore, SettingsStore, StoreError};
use parking_lot::Mutex;

/// 2023-11-14T22:13:20Z
pub const FIXED_NOW_MILLIS: i64 = 1_700_000_000_000;

pub fn blob(value: Value) -> ConfigBlob {
    ConfigBlob::from_value(value).unwrap()
}

pub fn path(dotted: &str) -> ShapePath {
    dotted.parse().unwrap()
}

pub fn fixed_reconciler() -> Reconciler {
    Reconciler::with_clock(Arc::new(FixedClock::at(FIXED_NOW_MILLIS)))
}

/// Widget placement record as a theme ships it
pub fn sidebars_record() -> ConfigBlob {
    blob(serde_json::json!({
        "sidebars_widgets": {
            "data": {
                "wp_inactive_widgets": [],
                "sidebar-1": ["search-2", "recent-posts-2"]
            },
            "time": 1_600_000_000
        },
        "array_version": 3
    }))
}

/// Shape requiring `element` in the sequence at `dotted`
pub fn membership_shape(dotted: &str, element: &str) -> DesiredShape {
    DesiredShape::new(vec![ShapeRule::containing(path(dotted), Value::from(element))]).unwrap()
}

/// Shape installing `value` at `dotted`, stamping `meta.time` in millis
pub fn stamped_default_shape(dotted: &str, value: Value) -> DesiredShape {
    DesiredShape::builder()
        .rule(ShapeRule::with_default(path(dotted), value))
        .marker(FreshnessMarker::millis(path("meta.time")))
        .build()
        .unwrap()
}

/// Store whose every operation fails with `Unavailable`
#[derive(Debug, Default)]
pub struct FailingStore;

fn offline(key: &str) -> StoreError {
    StoreError::Unavailable {
        key: key.to_owned(),
        source: io::Error::new(io::ErrorKind::ConnectionRefused, "store offline"),
    }
}

#[async_trait]
impl SettingsStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<ConfigBlob>, StoreError> {
        Err(offline(key))
    }

    async fn set(&self, key: &str, _blob: &ConfigBlob) -> Result<(), StoreError> {
        Err(offline(key))
    }

    async fn compare_and_set(
        &self,
        key: &str,
        _expected: Option<Revision>,
        _blob: &ConfigBlob,
    ) -> Result<bool, StoreError> {
        Err(offline(key))
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Err(offline("*"))
    }
}

/// Memory store that counts writes
#[derive(Debug, Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    writes: AtomicUsize,
}

impl CountingStore {
    pub fn with_records<K: Into<String>>(records: impl IntoIterator<Item = (K, ConfigBlob)>) -> Self {
        Self {
            inner: MemoryStore::with_records(records),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<ConfigBlob>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, blob: &ConfigBlob) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, blob).await
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<Revision>,
        blob: &ConfigBlob,
    ) -> Result<bool, StoreError> {
        let wrote = self.inner.compare_and_set(key, expected, blob).await?;
        if wrote {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(wrote)
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.inner.keys().await
    }
}

/// Memory store where an outside writer replaces the record right after
/// each of the first `interferences` reads
#[derive(Debug)]
pub struct MeddlingStore {
    pub inner: MemoryStore,
    remaining: Mutex<usize>,
    counter: AtomicUsize,
}

impl MeddlingStore {
    pub fn new(interferences: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            remaining: Mutex::new(interferences),
            counter: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SettingsStore for MeddlingStore {
    async fn get(&self, key: &str) -> Result<Option<ConfigBlob>, StoreError> {
        let seen = self.inner.get(key).await?;
        let meddle = {
            let mut remaining = self.remaining.lock();
            let meddle = *remaining > 0;
            *remaining = remaining.saturating_sub(1);
            meddle
        };
        if meddle {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            let mut other = seen.clone().unwrap_or_default();
            other
                .as_map_mut()
                .insert("outside_writer".to_owned(), Value::from(n));
            self.inner.set(key, &other).await?;
        }
        Ok(seen)
    }

    async fn set(&self, key: &str, blob: &ConfigBlob) -> Result<(), StoreError> {
        self.inner.set(key, blob).await
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<Revision>,
        blob: &ConfigBlob,
    ) -> Result<bool, StoreError> {
        self.inner.compare_and_set(key, expected, blob).await
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.inner.keys().await
    }
}
