//! optsync Blob Primitives
//!
//! Untyped settings records and the addressing used to reconcile them.
//!
//! # Core Concepts
//!
//! - [`ConfigBlob`]: One persisted settings record (nested mapping)
//! - [`ShapePath`]: Sequence of keys locating a value inside a record
//! - [`Revision`]: Blake3 hash of a record's canonical JSON
//!
//! # Example
//!
//! ```
//! use optsync_blob::{ConfigBlob, ShapePath};
//!
//! let blob = ConfigBlob::from_json(r#"{"layout": {"default": "right-sidebar"}}"#).unwrap();
//! let path: ShapePath = "layout.default".parse().unwrap();
//! assert_eq!(blob.get(&path).and_then(|v| v.as_str()), Some("right-sidebar"));
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod blob;
mod path;
mod revision;

pub use blob::{kind_of, BlobError, ConfigBlob};
pub use path::{PathError, ShapePath};
pub use revision::{Revision, RevisionError};

/// Re-exported so downstream crates name values the same way
pub use serde_json::{Map, Value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
