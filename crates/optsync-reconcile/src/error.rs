//! Error types for reconciliation
//!
//! - [`ShapeConflictError`]: a record holds a value the shape cannot accept
//! - [`ShapeError`]: a desired shape is malformed

use optsync_blob::ShapePath;

/// A required path exists but holds an incompatibly-typed value
///
/// Never resolved by overwriting: the caller decides whether to abort the
/// write or force it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("shape conflict at '{path}': expected {expected}, found {found}")]
pub struct ShapeConflictError {
    /// Location of the offending value
    pub path: ShapePath,
    /// Kind of value the shape requires there
    pub expected: &'static str,
    /// Kind of value actually present
    pub found: &'static str,
}

impl ShapeConflictError {
    /// Create a conflict error
    #[inline]
    #[must_use]
    pub fn new(path: ShapePath, expected: &'static str, found: &'static str) -> Self {
        Self {
            path,
            expected,
            found,
        }
    }
}

/// Errors in a desired shape declaration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// Rule targets the record root
    #[error("rule {index} has an empty path")]
    EmptyRulePath { index: usize },

    /// Rule declares neither a default nor a membership requirement
    #[error("rule for '{0}' needs a default, a required element, or both")]
    NothingRequired(ShapePath),

    /// Membership requirement paired with a non-sequence default
    #[error("rule for '{0}' requires an element but its default is not a sequence")]
    DefaultNotSequence(ShapePath),

    /// Membership rule's sequence would have to hold another rule's mapping
    #[error("rule for '{sequence}' requires a sequence but rule '{nested}' nests inside it")]
    SequenceHasChildren {
        sequence: ShapePath,
        nested: ShapePath,
    },

    /// A rule's default would install a value another rule rejects
    #[error("default of rule '{default}' installs a value rule '{rule}' cannot accept")]
    DefaultClashes { default: ShapePath, rule: ShapePath },

    /// Marker targets the record root
    #[error("freshness marker has an empty path")]
    EmptyMarkerPath,

    /// Marker path would overwrite data a rule owns
    #[error("freshness marker '{marker}' overlaps rule path '{rule}'")]
    MarkerOverlapsRule { marker: ShapePath, rule: ShapePath },

    /// Two distinct markers nest inside each other
    #[error("freshness markers '{0}' and '{1}' overlap")]
    MarkersOverlap(ShapePath, ShapePath),
}
