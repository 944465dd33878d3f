//! The reconciliation pass
//!
//! [`Reconciler::reconcile`] compares a record against a [`DesiredShape`]
//! and returns either the untouched input (borrowed) or a minimally
//! corrected copy. The input is never mutated; the copy is taken lazily,
//! right before the first edit.

use std::borrow::Cow;
use std::sync::Arc;

use optsync_blob::{kind_of, ConfigBlob, Map, ShapePath, Value};

use crate::clock::{Clock, SystemClock};
use crate::edit::Edit;
use crate::error::ShapeConflictError;
use crate::shape::{DesiredShape, FreshnessMarker, ShapeRule};

type Mapping = Map<String, Value>;

/// Outcome of one reconciliation pass
///
/// # Invariants
/// - `changed == false` ⇒ `blob` borrows the input and `edits` is empty
/// - `changed == true` ⇒ `blob` is owned and every path outside the shape
///   equals the input
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationResult<'a> {
    /// Whether the record must be written back
    pub changed: bool,
    /// The input, or its corrected copy
    pub blob: Cow<'a, ConfigBlob>,
    /// Edits applied, in order
    pub edits: Vec<Edit>,
}

impl<'a> ReconciliationResult<'a> {
    fn unchanged(blob: &'a ConfigBlob) -> Self {
        Self {
            changed: false,
            blob: Cow::Borrowed(blob),
            edits: Vec::new(),
        }
    }

    /// The resulting record, cloning only if it is still borrowed
    #[inline]
    #[must_use]
    pub fn into_owned(self) -> ConfigBlob {
        self.blob.into_owned()
    }

    /// The record to persist, if any
    #[inline]
    #[must_use]
    pub fn into_write(self) -> Option<ConfigBlob> {
        match self.blob {
            Cow::Owned(blob) if self.changed => Some(blob),
            _ => None,
        }
    }

    /// Structural edits, excluding marker bumps
    pub fn structural_edits(&self) -> impl Iterator<Item = &Edit> {
        self.edits.iter().filter(|e| !e.is_marker())
    }
}

/// Reconciles records against desired shapes
///
/// Stateless apart from its clock; cheap to clone and share.
#[derive(Debug, Clone)]
pub struct Reconciler {
    clock: Arc<dyn Clock>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    /// Reconciler using the system clock
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Reconciler using a custom clock for freshness markers
    #[inline]
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Bring `current` into `shape`
    ///
    /// Rules run in order. Missing or non-mapping intermediates become empty
    /// mappings, absent terminals receive their default, and required
    /// elements are appended to existing sequences. If anything changed,
    /// freshness markers are bumped afterwards.
    ///
    /// # Errors
    /// Returns [`ShapeConflictError`] when a required sequence holds some
    /// other kind of value, or (with strict intermediates) when a
    /// non-mapping sits on a rule's path. `current` is untouched either way.
    pub fn reconcile<'a>(
        &self,
        current: &'a ConfigBlob,
        shape: &DesiredShape,
    ) -> Result<ReconciliationResult<'a>, ShapeConflictError> {
        let strict = shape.strict_intermediates();
        let mut working: Option<ConfigBlob> = None;
        let mut edits = Vec::new();
        let mut markers: Vec<&FreshnessMarker> = Vec::new();

        for rule in shape.rules() {
            let view = working.as_ref().unwrap_or(current);
            if !needs_repair(view.as_map(), rule, strict)? {
                continue;
            }

            let blob = working.get_or_insert_with(|| current.clone());
            apply_rule(blob.as_map_mut(), rule, &mut edits);

            if let Some(marker) = rule.rule_marker() {
                push_marker(&mut markers, marker);
            }
        }

        let Some(mut blob) = working else {
            tracing::trace!(rules = shape.rules().len(), "record already satisfies shape");
            return Ok(ReconciliationResult::unchanged(current));
        };

        if let Some(marker) = shape.marker() {
            push_marker(&mut markers, marker);
        }
        let now = self.clock.now_millis();
        for marker in markers {
            bump_marker(blob.as_map_mut(), marker, now, strict, &mut edits)?;
        }

        tracing::debug!(edits = edits.len(), "record reconciled");
        Ok(ReconciliationResult {
            changed: true,
            blob: Cow::Owned(blob),
            edits,
        })
    }

    /// Whether `current` already satisfies `shape`
    ///
    /// # Errors
    /// Returns [`ShapeConflictError`] under the same conditions as
    /// [`Reconciler::reconcile`]
    pub fn check(
        &self,
        current: &ConfigBlob,
        shape: &DesiredShape,
    ) -> Result<bool, ShapeConflictError> {
        self.reconcile(current, shape).map(|result| !result.changed)
    }
}

/// Reconcile with the system clock
///
/// # Errors
/// See [`Reconciler::reconcile`]
pub fn reconcile<'a>(
    current: &'a ConfigBlob,
    shape: &DesiredShape,
) -> Result<ReconciliationResult<'a>, ShapeConflictError> {
    Reconciler::new().reconcile(current, shape)
}

fn push_marker<'s>(markers: &mut Vec<&'s FreshnessMarker>, marker: &'s FreshnessMarker) {
    if !markers.iter().any(|m| m.path == marker.path) {
        markers.push(marker);
    }
}

/// Walk the intermediate keys of `path` without modifying anything
///
/// `Ok(Some(parent))` when every intermediate is a mapping, `Ok(None)` when
/// a repair is needed.
fn walk<'m>(
    root: &'m Mapping,
    path: &ShapePath,
    strict: bool,
) -> Result<Option<&'m Mapping>, ShapeConflictError> {
    let Some((init, _)) = path.split_terminal() else {
        return Ok(None);
    };
    let mut current = root;
    for (depth, key) in init.iter().enumerate() {
        match current.get(key) {
            Some(Value::Object(map)) => current = map,
            Some(other) if strict => {
                return Err(ShapeConflictError::new(
                    path.prefix(depth + 1),
                    "mapping",
                    kind_of(other),
                ));
            }
            _ => return Ok(None),
        }
    }
    Ok(Some(current))
}

fn needs_repair(root: &Mapping, rule: &ShapeRule, strict: bool) -> Result<bool, ShapeConflictError> {
    let path = rule.path();
    let (Some(parent), Some(last)) = (walk(root, path, strict)?, path.last()) else {
        return Ok(true);
    };

    match (parent.get(last), rule.requirement()) {
        (None, _) => Ok(true),
        (Some(_), None) => Ok(false),
        (Some(Value::Array(items)), Some(element)) => Ok(!items.contains(element)),
        (Some(other), Some(_)) => Err(ShapeConflictError::new(
            path.clone(),
            "sequence",
            kind_of(other),
        )),
    }
}

/// Materialize mappings along the intermediate keys of `path`
///
/// Returns the mapping that holds the terminal key.
fn descend<'m>(root: &'m mut Mapping, path: &ShapePath, edits: &mut Vec<Edit>) -> Option<&'m mut Mapping> {
    let (init, _) = path.split_terminal()?;
    let mut current = root;
    for (depth, key) in init.iter().enumerate() {
        match current.get(key) {
            Some(Value::Object(_)) => {}
            existing => {
                edits.push(Edit::CreatedMapping {
                    path: path.prefix(depth + 1),
                    replaced: existing.map(kind_of),
                });
                current.insert(key.clone(), Value::Object(Map::new()));
            }
        }
        current = current.get_mut(key)?.as_object_mut()?;
    }
    Some(current)
}

fn apply_rule(root: &mut Mapping, rule: &ShapeRule, edits: &mut Vec<Edit>) {
    let path = rule.path();
    let Some(last) = path.last() else {
        return;
    };
    let Some(parent) = descend(root, path, edits) else {
        return;
    };

    match parent.get_mut(last) {
        None => {
            let value = rule.initial_value();
            edits.push(Edit::InstalledDefault {
                path: path.clone(),
                value: value.clone(),
            });
            parent.insert(last.to_owned(), value);
        }
        Some(Value::Array(items)) => {
            if let Some(element) = rule.requirement() {
                if !items.contains(element) {
                    items.push(element.clone());
                    edits.push(Edit::AppendedMember {
                        path: path.clone(),
                        element: element.clone(),
                    });
                }
            }
        }
        // Kind mismatches were rejected by `needs_repair`.
        Some(_) => {}
    }
}

fn bump_marker(
    root: &mut Mapping,
    marker: &FreshnessMarker,
    now_millis: i64,
    strict: bool,
    edits: &mut Vec<Edit>,
) -> Result<(), ShapeConflictError> {
    let Some(last) = marker.path.last() else {
        return Ok(());
    };
    if strict {
        walk(root, &marker.path, strict)?;
    }
    let Some(parent) = descend(root, &marker.path, edits) else {
        return Ok(());
    };

    let mut value = marker.unit.convert_millis(now_millis);
    if let Some(previous) = parent.get(last).and_then(Value::as_i64) {
        value = value.max(previous.saturating_add(1));
    }
    parent.insert(last.to_owned(), Value::from(value));
    edits.push(Edit::BumpedMarker {
        path: marker.path.clone(),
        value,
    });
    Ok(())
}
