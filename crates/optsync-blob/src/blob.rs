//! Settings record blobs
//!
//! A [`ConfigBlob`] is one persisted settings record: a mapping from string
//! keys to arbitrary JSON values. Key order is preserved, so edits never
//! reorder siblings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::path::ShapePath;
use crate::revision::Revision;

/// One settings record
///
/// The root is always a mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigBlob(Map<String, Value>);

impl ConfigBlob {
    /// Create an empty record
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing mapping
    #[inline]
    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Convert a JSON value into a record
    ///
    /// # Errors
    /// Returns [`BlobError::NotAMapping`] if the root is not an object
    pub fn from_value(value: Value) -> Result<Self, BlobError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(BlobError::NotAMapping(kind_of(&other))),
        }
    }

    /// Parse a record from JSON text
    ///
    /// # Errors
    /// Returns error if the text is not JSON or its root is not an object
    pub fn from_json(json: &str) -> Result<Self, BlobError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Pretty JSON rendering
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json_pretty(&self) -> Result<String, BlobError> {
        Ok(serde_json::to_string_pretty(&self.0)?)
    }

    /// Borrow the root mapping
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Mutably borrow the root mapping
    #[inline]
    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// Convert into a JSON value
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Number of top-level keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no keys
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the value at `path`
    ///
    /// The root path has no value of its own and yields `None`.
    #[must_use]
    pub fn get(&self, path: &ShapePath) -> Option<&Value> {
        let (init, last) = path.split_terminal()?;
        let mut current = &self.0;
        for key in init {
            current = current.get(key)?.as_object()?;
        }
        current.get(last)
    }

    /// Whether a value exists at `path`
    #[inline]
    #[must_use]
    pub fn contains(&self, path: &ShapePath) -> bool {
        self.get(path).is_some()
    }

    /// Canonical JSON: keys sorted at every depth
    #[must_use]
    pub fn canonical_json(&self) -> String {
        canonicalize(&Value::Object(self.0.clone())).to_string()
    }

    /// Revision of this record's canonical form
    #[must_use]
    pub fn revision(&self) -> Revision {
        Revision::compute(self.canonical_json().as_bytes())
    }
}

impl From<Map<String, Value>> for ConfigBlob {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for ConfigBlob {
    type Error = BlobError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<ConfigBlob> for Value {
    fn from(blob: ConfigBlob) -> Self {
        blob.into_value()
    }
}

/// Short name of a JSON value's kind, for diagnostics
#[must_use]
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();
            let sorted = keys
                .into_iter()
                .filter_map(|k| map.get(k).map(|v| (k.clone(), canonicalize(v))))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Errors converting to and from records
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// Root value is not a mapping
    #[error("record root must be a mapping, found {0}")]
    NotAMapping(&'static str),

    /// JSON syntax or serialization error
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn blob(value: Value) -> ConfigBlob {
        ConfigBlob::from_value(value).unwrap()
    }

    #[test]
    fn from_value_rejects_non_mapping() {
        let err = ConfigBlob::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, BlobError::NotAMapping("sequence")));
    }

    #[test]
    fn from_json_parses_object() {
        let b = ConfigBlob::from_json(r#"{"posts_per_page": 10}"#).unwrap();
        assert_eq!(b.get(&ShapePath::single("posts_per_page")), Some(&json!(10)));
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(matches!(
            ConfigBlob::from_json("not json"),
            Err(BlobError::Json(_))
        ));
    }

    #[test]
    fn get_walks_nested_mappings() {
        let b = blob(json!({"sidebars_widgets": {"data": {"sidebar-2": ["search-2"]}}}));
        let path: ShapePath = "sidebars_widgets.data.sidebar-2".parse().unwrap();
        assert_eq!(b.get(&path), Some(&json!(["search-2"])));
        assert!(b.contains(&path));
    }

    #[test]
    fn get_stops_at_scalars() {
        let b = blob(json!({"a": "scalar"}));
        assert_eq!(b.get(&"a.b".parse().unwrap()), None);
        assert_eq!(b.get(&ShapePath::root()), None);
    }

    #[test]
    fn preserves_insertion_order() {
        let b = ConfigBlob::from_json(r#"{"zeta": 1, "alpha": 2}"#).unwrap();
        let keys: Vec<_> = b.as_map().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta".to_string(), "alpha".to_string()]);
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let b = ConfigBlob::from_json(r#"{"b": {"y": 1, "x": 2}, "a": [3]}"#).unwrap();
        assert_eq!(b.canonical_json(), r#"{"a":[3],"b":{"x":2,"y":1}}"#);
    }

    #[test]
    fn revision_ignores_key_order() {
        let a = ConfigBlob::from_json(r#"{"b": 1, "a": 2}"#).unwrap();
        let b = ConfigBlob::from_json(r#"{"a": 2, "b": 1}"#).unwrap();
        assert_eq!(a.revision(), b.revision());
    }

    #[test]
    fn revision_tracks_content() {
        let a = blob(json!({"a": 1}));
        let b = blob(json!({"a": 2}));
        assert_ne!(a.revision(), b.revision());
    }

    #[test]
    fn serde_transparent() {
        let b = blob(json!({"k": true}));
        assert_eq!(serde_json::to_string(&b).unwrap(), r#"{"k":true}"#);
        let back: ConfigBlob = serde_json::from_str(r#"{"k":true}"#).unwrap();
        assert_eq!(back, b);
    }
}
