//! optsync Reconciler
//!
//! Idempotent reconciliation of settings records against a declarative
//! desired shape.
//!
//! # Core Concepts
//!
//! - [`DesiredShape`]: ordered [`ShapeRule`]s plus optional freshness markers
//! - [`Reconciler`]: pure pass producing a [`ReconciliationResult`]
//! - [`ShapeConflictError`]: a required location holds an incompatible value
//!
//! # Guarantees
//!
//! - Running the pass on its own output reports no change
//! - Keys outside the shape are never removed, rewritten or reordered
//! - An unchanged record is returned borrowed, so callers skip the write
//!
//! # Example
//!
//! ```
//! use optsync_blob::ConfigBlob;
//! use optsync_reconcile::{reconcile, DesiredShape, ShapeRule};
//! use serde_json::json;
//!
//! let shape = DesiredShape::new(vec![ShapeRule::containing(
//!     "sidebars_widgets.data.sidebar-2".parse().unwrap(),
//!     json!("search-2"),
//! )])
//! .unwrap();
//!
//! let current = ConfigBlob::new();
//! let result = reconcile(&current, &shape).unwrap();
//! assert!(result.changed);
//!
//! let again = reconcile(result.blob.as_ref(), &shape).unwrap();
//! assert!(!again.changed);
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod clock;
mod edit;
mod error;
pub mod presets;
mod reconciler;
mod shape;

pub use clock::{Clock, FixedClock, SystemClock};
pub use edit::Edit;
pub use error::{ShapeConflictError, ShapeError};
pub use reconciler::{reconcile, ReconciliationResult, Reconciler};
pub use shape::{DesiredShape, FreshnessMarker, ShapeBuilder, ShapeRule, TimeUnit};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
