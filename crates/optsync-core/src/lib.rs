//! optsync Core
//!
//! Keeps persisted settings records in their desired shapes. A
//! [`Synchronizer`] owns a [`SettingsStore`](optsync_store::SettingsStore)
//! and a set of [`Binding`]s (record key + shape + triggering events); on
//! each [`LifecycleEvent`] it reads the affected records, reconciles them and
//! writes back only those that diverge.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use optsync_core::{Binding, LifecycleEvent, Synchronizer};
//! use optsync_reconcile::presets;
//! use optsync_store::MemoryStore;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sync = Synchronizer::new(Arc::new(MemoryStore::new()))
//!     .bind(Binding::new("theme_mods", presets::pagination(10)));
//!
//! let report = sync.dispatch(&LifecycleEvent::Startup).await;
//! assert_eq!(report.written(), 1);
//!
//! let report = sync.dispatch(&LifecycleEvent::Startup).await;
//! assert!(report.is_converged());
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod binding;
mod config;
mod error;
mod event;
mod shape_file;
mod sync;

pub use binding::Binding;
pub use config::{SyncConfig, DEFAULT_MAX_CAS_RETRIES};
pub use error::{ConfigError, ShapeFileError, SyncError};
pub use event::{EventFilter, LifecycleEvent, UnknownEvent};
pub use shape_file::{ShapeFile, ShapeFormat};
pub use sync::{BindingReport, SyncOutcome, SyncReport, Synchronizer};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
