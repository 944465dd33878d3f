//! Structural edits produced by reconciliation
//!
//! Each [`Edit`] records one change made to a record, in application order.
//! They are informational: the corrected record is the source of truth.

use std::fmt::{self, Display, Formatter};

use optsync_blob::{ShapePath, Value};
use serde::Serialize;

/// One change applied to a record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    /// Empty mapping created at an intermediate key
    CreatedMapping {
        /// Location of the new mapping
        path: ShapePath,
        /// Kind of value the mapping replaced, if a value was present
        #[serde(skip_serializing_if = "Option::is_none")]
        replaced: Option<&'static str>,
    },
    /// Default installed at an absent terminal key
    InstalledDefault {
        /// Location of the default
        path: ShapePath,
        /// Installed value
        value: Value,
    },
    /// Required element appended to an existing sequence
    AppendedMember {
        /// Location of the sequence
        path: ShapePath,
        /// Appended element
        element: Value,
    },
    /// Freshness marker written
    BumpedMarker {
        /// Location of the marker
        path: ShapePath,
        /// New timestamp
        value: i64,
    },
}

impl Edit {
    /// Location the edit touched
    #[inline]
    #[must_use]
    pub fn path(&self) -> &ShapePath {
        match self {
            Self::CreatedMapping { path, .. }
            | Self::InstalledDefault { path, .. }
            | Self::AppendedMember { path, .. }
            | Self::BumpedMarker { path, .. } => path,
        }
    }

    /// Whether the edit is a marker bump rather than structural data
    #[inline]
    #[must_use]
    pub fn is_marker(&self) -> bool {
        matches!(self, Self::BumpedMarker { .. })
    }
}

impl Display for Edit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreatedMapping {
                path,
                replaced: None,
            } => write!(f, "create mapping {path}"),
            Self::CreatedMapping {
                path,
                replaced: Some(kind),
            } => write!(f, "replace {kind} at {path} with mapping"),
            Self::InstalledDefault { path, value } => write!(f, "install default {path} = {value}"),
            Self::AppendedMember { path, element } => write!(f, "append {element} to {path}"),
            Self::BumpedMarker { path, value } => write!(f, "bump marker {path} = {value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn edit_description() {
        let edit = Edit::AppendedMember {
            path: ShapePath::of(["a", "b"]),
            element: json!("y"),
        };
        assert_eq!(edit.to_string(), r#"append "y" to a.b"#);
        assert!(!edit.is_marker());
    }

    #[test]
    fn edit_serializes_tagged() {
        let edit = Edit::BumpedMarker {
            path: ShapePath::of(["w", "time"]),
            value: 7,
        };
        assert_eq!(
            serde_json::to_value(&edit).unwrap(),
            json!({"op": "bumped_marker", "path": "w.time", "value": 7})
        );
    }
}
