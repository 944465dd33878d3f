//! Synchronizer: read, reconcile, write back on divergence
//!
//! # Write protocol
//!
//! 1. Take the per-key async lock (writers in this process)
//! 2. Read the record and remember its revision
//! 3. Reconcile; stop if unchanged or conflicting
//! 4. Compare-and-swap against the remembered revision (writers elsewhere)
//! 5. On a lost swap, start again from 2, up to `max_cas_retries` times

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use optsync_blob::ConfigBlob;
use optsync_reconcile::{Edit, ReconciliationResult, Reconciler, ShapeConflictError};
use optsync_store::SettingsStore;
use tokio::sync::Mutex;

use crate::binding::Binding;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::event::LifecycleEvent;

/// What one pass did to a record
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Record already had the desired shape
    Unchanged,
    /// Corrected record was written
    Written {
        /// Edits applied
        edits: Vec<Edit>,
    },
    /// Record diverges but dry run suppressed the write
    WouldWrite {
        /// Edits that would be applied
        edits: Vec<Edit>,
    },
    /// Record holds values the shape cannot accept; left untouched
    Conflict {
        /// The incompatible location
        error: ShapeConflictError,
    },
}

impl SyncOutcome {
    /// Whether the record differs (or differed) from its shape
    #[inline]
    #[must_use]
    pub fn diverged(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }

    /// Edits applied or proposed
    #[must_use]
    pub fn edits(&self) -> &[Edit] {
        match self {
            Self::Written { edits } | Self::WouldWrite { edits } => edits,
            Self::Unchanged | Self::Conflict { .. } => &[],
        }
    }
}

impl Display for SyncOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => f.write_str("unchanged"),
            Self::Written { edits } => write!(f, "written ({} edits)", edits.len()),
            Self::WouldWrite { edits } => write!(f, "would write ({} edits)", edits.len()),
            Self::Conflict { error } => write!(f, "conflict: {error}"),
        }
    }
}

/// Result of one binding within a dispatch
#[derive(Debug)]
pub struct BindingReport {
    /// Record key
    pub key: String,
    /// Pass result
    pub result: Result<SyncOutcome, SyncError>,
}

/// Results of every binding a dispatch ran
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Per-binding results, in registration order
    pub entries: Vec<BindingReport>,
}

impl SyncReport {
    /// Number of bindings run
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no binding ran
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Outcomes of bindings that completed
    pub fn outcomes(&self) -> impl Iterator<Item = (&str, &SyncOutcome)> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().ok().map(|o| (e.key.as_str(), o)))
    }

    /// Bindings that failed
    pub fn failures(&self) -> impl Iterator<Item = (&str, &SyncError)> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().err().map(|err| (e.key.as_str(), err)))
    }

    /// Number of records written
    #[must_use]
    pub fn written(&self) -> usize {
        self.outcomes()
            .filter(|(_, o)| matches!(o, SyncOutcome::Written { .. }))
            .count()
    }

    /// Number of conflicting records
    #[must_use]
    pub fn conflicts(&self) -> usize {
        self.outcomes()
            .filter(|(_, o)| matches!(o, SyncOutcome::Conflict { .. }))
            .count()
    }

    /// Whether every record already matched and nothing failed
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.entries
            .iter()
            .all(|e| matches!(e.result, Ok(SyncOutcome::Unchanged)))
    }
}

/// Keeps store records in their desired shapes
pub struct Synchronizer<S> {
    store: Arc<S>,
    bindings: Vec<Binding>,
    reconciler: Reconciler,
    config: SyncConfig,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<S> std::fmt::Debug for Synchronizer<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("bindings", &self.bindings.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: SettingsStore> Synchronizer<S> {
    /// Synchronizer over `store` with default settings and no bindings
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            bindings: Vec::new(),
            reconciler: Reconciler::new(),
            config: SyncConfig::default(),
            locks: DashMap::new(),
        }
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the reconciler (e.g. to inject a clock)
    #[must_use]
    pub fn with_reconciler(mut self, reconciler: Reconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    /// Add a binding
    #[must_use]
    pub fn bind(mut self, binding: Binding) -> Self {
        self.register(binding);
        self
    }

    /// Add a binding in place
    pub fn register(&mut self, binding: Binding) {
        tracing::debug!(key = %binding.key(), "binding registered");
        self.bindings.push(binding);
    }

    /// Registered bindings
    #[inline]
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(key.to_owned()).or_default().value())
    }

    /// Bring one record into its shape
    ///
    /// # Errors
    /// Returns [`SyncError::StoreUnavailable`] if the store fails and
    /// [`SyncError::Contended`] if every compare-and-swap lost
    pub async fn ensure(&self, binding: &Binding) -> Result<SyncOutcome, SyncError> {
        let key = binding.key();
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;

        let attempts = self.config.max_cas_retries.saturating_add(1);
        for attempt in 1..=attempts {
            let stored = self.store.get(key).await?;
            let expected = stored.as_ref().map(ConfigBlob::revision);
            let current = stored.unwrap_or_default();

            let ReconciliationResult { changed, blob, edits } =
                match self.reconciler.reconcile(&current, binding.shape()) {
                    Ok(result) => result,
                    Err(error) => {
                        tracing::warn!(key, %error, "record conflicts with its shape; left untouched");
                        return Ok(SyncOutcome::Conflict { error });
                    }
                };

            if !changed {
                tracing::debug!(key, "record already in shape");
                return Ok(SyncOutcome::Unchanged);
            }

            if self.config.dry_run {
                tracing::info!(key, edits = edits.len(), "dry run: record would be rewritten");
                return Ok(SyncOutcome::WouldWrite { edits });
            }

            if self.store.compare_and_set(key, expected, &blob).await? {
                tracing::info!(key, edits = edits.len(), "record reconciled");
                return Ok(SyncOutcome::Written { edits });
            }
            tracing::debug!(key, attempt, "record changed concurrently; retrying");
        }

        Err(SyncError::Contended {
            key: key.to_owned(),
            attempts,
        })
    }

    /// Run every binding triggered by `event`
    ///
    /// Never fails: per-binding errors are logged and collected in the
    /// report. Bindings for distinct keys run concurrently.
    pub async fn dispatch(&self, event: &LifecycleEvent) -> SyncReport {
        let triggered: Vec<&Binding> = self
            .bindings
            .iter()
            .filter(|b| b.triggered_by(event))
            .collect();
        tracing::info!(%event, bindings = triggered.len(), "dispatching lifecycle event");
        self.run(triggered).await
    }

    /// Run every registered binding regardless of its events
    pub async fn ensure_all(&self) -> SyncReport {
        self.run(self.bindings.iter().collect()).await
    }

    async fn run(&self, bindings: Vec<&Binding>) -> SyncReport {
        let passes = bindings.into_iter().map(|binding| async move {
            let result = self.ensure(binding).await;
            if let Err(error) = &result {
                tracing::error!(key = %binding.key(), %error, "synchronization failed");
            }
            BindingReport {
                key: binding.key().to_owned(),
                result,
            }
        });
        SyncReport {
            entries: join_all(passes).await,
        }
    }
}
