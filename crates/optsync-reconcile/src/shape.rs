//! Desired shape declarations
//!
//! A [`DesiredShape`] is an ordered list of [`ShapeRule`]s plus optional
//! freshness markers. Shapes are validated on construction and on
//! deserialization, so a [`DesiredShape`] value is always well formed.

use optsync_blob::{ShapePath, Value};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ShapeError;

/// Unit of a freshness marker timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Unix seconds
    #[default]
    Seconds,
    /// Unix milliseconds
    Millis,
}

impl TimeUnit {
    /// Convert a millisecond timestamp into this unit
    #[inline]
    #[must_use]
    pub fn convert_millis(self, millis: i64) -> i64 {
        match self {
            Self::Seconds => millis.div_euclid(1000),
            Self::Millis => millis,
        }
    }
}

/// Timestamp field bumped whenever reconciliation changes a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FreshnessMarker {
    /// Where the timestamp lives
    pub path: ShapePath,
    /// Timestamp unit
    #[serde(default)]
    pub unit: TimeUnit,
}

impl FreshnessMarker {
    /// Marker in Unix seconds
    #[inline]
    #[must_use]
    pub fn seconds(path: ShapePath) -> Self {
        Self {
            path,
            unit: TimeUnit::Seconds,
        }
    }

    /// Marker in Unix milliseconds
    #[inline]
    #[must_use]
    pub fn millis(path: ShapePath) -> Self {
        Self {
            path,
            unit: TimeUnit::Millis,
        }
    }
}

/// One required location inside a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShapeRule {
    path: ShapePath,

    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    default: Option<Value>,

    #[serde(
        default,
        alias = "contains",
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    require: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    marker: Option<FreshnessMarker>,
}

// An explicit `null` is a real value, not an absent field.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl ShapeRule {
    /// Rule with nothing required yet
    #[inline]
    #[must_use]
    pub fn new(path: ShapePath) -> Self {
        Self {
            path,
            default: None,
            require: None,
            marker: None,
        }
    }

    /// Rule installing `value` when the path is absent
    #[inline]
    #[must_use]
    pub fn with_default(path: ShapePath, value: Value) -> Self {
        Self::new(path).default_value(value)
    }

    /// Rule requiring the sequence at `path` to contain `element`
    #[inline]
    #[must_use]
    pub fn containing(path: ShapePath, element: Value) -> Self {
        Self::new(path).require(element)
    }

    /// Set the default value
    #[inline]
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Set the membership requirement
    #[inline]
    #[must_use]
    pub fn require(mut self, element: Value) -> Self {
        self.require = Some(element);
        self
    }

    /// Bump `marker` whenever this rule changes the record
    #[inline]
    #[must_use]
    pub fn marker(mut self, marker: FreshnessMarker) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Target path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &ShapePath {
        &self.path
    }

    /// Default value, if declared
    #[inline]
    #[must_use]
    pub fn default_ref(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Required sequence element, if declared
    #[inline]
    #[must_use]
    pub fn requirement(&self) -> Option<&Value> {
        self.require.as_ref()
    }

    /// Per-rule freshness marker, if declared
    #[inline]
    #[must_use]
    pub fn rule_marker(&self) -> Option<&FreshnessMarker> {
        self.marker.as_ref()
    }

    /// Value installed when the terminal key is absent
    ///
    /// Already contains the required element, so a second pass over the
    /// installed value is a no-op.
    #[must_use]
    pub fn initial_value(&self) -> Value {
        let mut value = self
            .default
            .clone()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        if let (Some(element), Value::Array(items)) = (&self.require, &mut value) {
            if !items.contains(element) {
                items.push(element.clone());
            }
        }
        value
    }

    fn validate(&self, index: usize) -> Result<(), ShapeError> {
        if self.path.is_empty() {
            return Err(ShapeError::EmptyRulePath { index });
        }
        match (&self.default, &self.require) {
            (None, None) => Err(ShapeError::NothingRequired(self.path.clone())),
            (Some(default), Some(_)) if !default.is_array() => {
                Err(ShapeError::DefaultNotSequence(self.path.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// Declarative description of what a record must contain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawShape", into = "RawShape")]
pub struct DesiredShape {
    pub(crate) rules: Vec<ShapeRule>,
    pub(crate) marker: Option<FreshnessMarker>,
    pub(crate) strict_intermediates: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawShape {
    #[serde(default)]
    rules: Vec<ShapeRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    marker: Option<FreshnessMarker>,
    #[serde(default)]
    strict_intermediates: bool,
}

impl TryFrom<RawShape> for DesiredShape {
    type Error = ShapeError;

    fn try_from(raw: RawShape) -> Result<Self, Self::Error> {
        let shape = Self {
            rules: raw.rules,
            marker: raw.marker,
            strict_intermediates: raw.strict_intermediates,
        };
        shape.validate()?;
        Ok(shape)
    }
}

impl From<DesiredShape> for RawShape {
    fn from(shape: DesiredShape) -> Self {
        Self {
            rules: shape.rules,
            marker: shape.marker,
            strict_intermediates: shape.strict_intermediates,
        }
    }
}

impl DesiredShape {
    /// Shape from rules alone
    ///
    /// # Errors
    /// Returns error if any rule is malformed
    pub fn new(rules: Vec<ShapeRule>) -> Result<Self, ShapeError> {
        Self::builder().rules(rules).build()
    }

    /// Start building a shape
    #[inline]
    #[must_use]
    pub fn builder() -> ShapeBuilder {
        ShapeBuilder::default()
    }

    /// Rules in application order
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &[ShapeRule] {
        &self.rules
    }

    /// Record-level freshness marker
    #[inline]
    #[must_use]
    pub fn marker(&self) -> Option<&FreshnessMarker> {
        self.marker.as_ref()
    }

    /// Whether non-mapping intermediates are conflicts instead of repairs
    #[inline]
    #[must_use]
    pub fn strict_intermediates(&self) -> bool {
        self.strict_intermediates
    }

    /// Combine two shapes targeting the same record
    ///
    /// Rules of `other` run after ours; `other`'s record marker wins if both
    /// declare one.
    ///
    /// # Errors
    /// Returns error if the combination is malformed (e.g. a marker of one
    /// overlaps a rule of the other)
    pub fn merge(&self, other: &Self) -> Result<Self, ShapeError> {
        let merged = Self {
            rules: self.rules.iter().chain(&other.rules).cloned().collect(),
            marker: other.marker.clone().or_else(|| self.marker.clone()),
            strict_intermediates: self.strict_intermediates || other.strict_intermediates,
        };
        merged.validate()?;
        Ok(merged)
    }

    fn markers(&self) -> impl Iterator<Item = &FreshnessMarker> {
        self.marker
            .iter()
            .chain(self.rules.iter().filter_map(ShapeRule::rule_marker))
    }

    fn validate(&self) -> Result<(), ShapeError> {
        for (index, rule) in self.rules.iter().enumerate() {
            rule.validate(index)?;
        }
        for sequence in self.rules.iter().filter(|r| r.require.is_some()) {
            if let Some(nested) = self
                .rules
                .iter()
                .find(|r| r.path.len() > sequence.path.len() && sequence.path.is_prefix_of(&r.path))
            {
                return Err(ShapeError::SequenceHasChildren {
                    sequence: sequence.path.clone(),
                    nested: nested.path.clone(),
                });
            }
        }

        for outer in &self.rules {
            if let Some(inner) = self
                .rules
                .iter()
                .find(|inner| {
                    !std::ptr::eq(*inner, outer)
                        && installs_conflict(outer, inner, self.strict_intermediates)
                })
            {
                return Err(ShapeError::DefaultClashes {
                    default: outer.path.clone(),
                    rule: inner.path.clone(),
                });
            }
        }

        let markers: Vec<&FreshnessMarker> = self.markers().collect();
        for (i, marker) in markers.iter().enumerate() {
            if marker.path.is_empty() {
                return Err(ShapeError::EmptyMarkerPath);
            }
            if let Some(rule) = self.rules.iter().find(|r| r.path.overlaps(&marker.path)) {
                return Err(ShapeError::MarkerOverlapsRule {
                    marker: marker.path.clone(),
                    rule: rule.path.clone(),
                });
            }
            for other in &markers[i + 1..] {
                if other.path != marker.path && other.path.overlaps(&marker.path) {
                    return Err(ShapeError::MarkersOverlap(
                        marker.path.clone(),
                        other.path.clone(),
                    ));
                }
            }
        }
        Ok(())
    }
}

// Whether the value `outer` installs at or above `inner`'s path would make
// `inner` conflict when `outer` runs first.
fn installs_conflict(outer: &ShapeRule, inner: &ShapeRule, strict: bool) -> bool {
    if outer.default.is_none() || !outer.path.is_prefix_of(&inner.path) {
        return false;
    }
    let installed = outer.initial_value();
    let mut value = &installed;
    for key in &inner.path.segments()[outer.path.len()..] {
        let Value::Object(map) = value else {
            return strict;
        };
        match map.get(key) {
            Some(next) => value = next,
            None => return false,
        }
    }
    inner.require.is_some() && !value.is_array()
}

/// Builder for [`DesiredShape`]
#[derive(Debug, Clone, Default)]
pub struct ShapeBuilder {
    rules: Vec<ShapeRule>,
    marker: Option<FreshnessMarker>,
    strict_intermediates: bool,
}

impl ShapeBuilder {
    /// Append a rule
    #[inline]
    #[must_use]
    pub fn rule(mut self, rule: ShapeRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Append several rules
    #[inline]
    #[must_use]
    pub fn rules(mut self, rules: impl IntoIterator<Item = ShapeRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Record-level freshness marker, bumped on any change
    #[inline]
    #[must_use]
    pub fn marker(mut self, marker: FreshnessMarker) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Treat non-mapping intermediates as conflicts
    #[inline]
    #[must_use]
    pub fn strict_intermediates(mut self, strict: bool) -> Self {
        self.strict_intermediates = strict;
        self
    }

    /// Validate and build
    ///
    /// # Errors
    /// Returns error if any rule or marker is malformed
    pub fn build(self) -> Result<DesiredShape, ShapeError> {
        DesiredShape::try_from(RawShape {
            rules: self.rules,
            marker: self.marker,
            strict_intermediates: self.strict_intermediates,
        })
    }
}
