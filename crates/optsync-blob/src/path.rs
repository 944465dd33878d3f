//! Key paths for addressing within settings records
//!
//! Provides [`ShapePath`] for hierarchical addressing of values inside a
//! [`ConfigBlob`](crate::ConfigBlob).

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Path within a settings record
///
/// A sequence of mapping keys, outermost first.
///
/// # Examples
/// - `["sidebars_widgets", "data", "sidebar-2"]` → `sidebars_widgets.data.sidebar-2`
/// - `["pagination", "posts_per_page"]` → `pagination.posts_per_page`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShapePath(Vec<String>);

impl ShapePath {
    /// Create new path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Create path from a single segment
    #[inline]
    #[must_use]
    pub fn single(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// Build a path from anything yielding string-like segments
    #[must_use]
    pub fn of<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Empty path (the record root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0
            .split_last()
            .map(|(_, init)| Self(init.to_vec()))
    }

    /// Get last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Split into the intermediate keys and the terminal key
    #[inline]
    #[must_use]
    pub fn split_terminal(&self) -> Option<(&[String], &str)> {
        self.0
            .split_last()
            .map(|(last, init)| (init, last.as_str()))
    }

    /// Path made of the first `n` segments
    #[inline]
    #[must_use]
    pub fn prefix(&self, n: usize) -> Self {
        Self(self.0.iter().take(n).cloned().collect())
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Check if this path is a prefix of another
    ///
    /// # Examples
    /// - `layout` is prefix of `layout.default`
    /// - `layout` is NOT prefix of `pagination.style`
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Check if paths overlap (one is prefix of other)
    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Whether the dotted form round-trips through [`FromStr`]
    fn is_dottable(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|s| !s.is_empty() && !s.contains('.'))
    }
}

impl Display for ShapePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for ShapePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let segments = s
            .split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Err(PathError::EmptySegment(s.to_string()))
                } else {
                    Ok(seg.to_string())
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

impl From<Vec<String>> for ShapePath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<&[&str]> for ShapePath {
    fn from(segments: &[&str]) -> Self {
        Self::of(segments.iter().copied())
    }
}

impl Default for ShapePath {
    fn default() -> Self {
        Self::root()
    }
}

// Dotted string when unambiguous, list of segments otherwise.
impl Serialize for ShapePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.is_dottable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for ShapePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Dotted(String),
            Segments(Vec<String>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Dotted(s) => s.parse().map_err(serde::de::Error::custom),
            Repr::Segments(segments) => Ok(Self(segments)),
        }
    }
}

/// Errors related to key paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in dotted path
    #[error("path '{0}' contains an empty segment")]
    EmptySegment(String),
}
