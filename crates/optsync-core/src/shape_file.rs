//! Shape files
//!
//! A shape file binds one store record to a desired shape. The format is
//! chosen by extension: `.yaml`/`.yml`, `.json` or `.toml`.
//!
//! ```yaml
//! key: sidebars_widgets
//! events: [startup, "theme_activated:twentytwenty"]
//! rules:
//!   - path: data.sidebar-2
//!     contains: search-2
//! marker:
//!   path: time
//! ```

use std::path::Path;

use optsync_reconcile::{DesiredShape, FreshnessMarker, ShapeRule};
use serde::Deserialize;

use crate::binding::Binding;
use crate::error::ShapeFileError;
use crate::event::EventFilter;

const INLINE: &str = "<inline>";

/// Shape file encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeFormat {
    /// YAML document
    Yaml,
    /// JSON document
    Json,
    /// TOML document
    Toml,
}

impl ShapeFormat {
    /// Format implied by a file extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// A parsed shape file
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeFile {
    /// Store record key
    pub key: String,
    /// Validated shape
    pub shape: DesiredShape,
    /// Triggering events
    pub events: Vec<EventFilter>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawShapeFile {
    key: String,
    #[serde(default = "default_events")]
    events: Vec<EventFilter>,
    #[serde(default)]
    rules: Vec<ShapeRule>,
    #[serde(default)]
    marker: Option<FreshnessMarker>,
    #[serde(default)]
    strict_intermediates: bool,
}

fn default_events() -> Vec<EventFilter> {
    vec![EventFilter::Startup]
}

impl ShapeFile {
    /// Read and parse a shape file
    ///
    /// # Errors
    /// Returns [`ShapeFileError`] if the file is unreadable, has an unknown
    /// extension, fails to parse or declares an invalid shape
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ShapeFileError> {
        let path = path.as_ref();
        let format =
            ShapeFormat::from_path(path).ok_or_else(|| ShapeFileError::UnknownFormat(path.into()))?;
        let text = std::fs::read_to_string(path).map_err(|source| ShapeFileError::Io {
            path: path.into(),
            source,
        })?;
        let file = Self::parse_at(&text, format, path)?;
        tracing::debug!(path = %path.display(), key = %file.key, rules = file.shape.rules().len(), "loaded shape file");
        Ok(file)
    }

    /// Parse shape file text
    ///
    /// # Errors
    /// Returns [`ShapeFileError::Parse`] or [`ShapeFileError::Invalid`]
    pub fn parse(text: &str, format: ShapeFormat) -> Result<Self, ShapeFileError> {
        Self::parse_at(text, format, Path::new(INLINE))
    }

    fn parse_at(text: &str, format: ShapeFormat, path: &Path) -> Result<Self, ShapeFileError> {
        let parse_error = |reason: String| ShapeFileError::Parse {
            path: path.into(),
            reason,
        };
        let raw: RawShapeFile = match format {
            ShapeFormat::Yaml => serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string()))?,
            ShapeFormat::Json => serde_json::from_str(text).map_err(|e| parse_error(e.to_string()))?,
            ShapeFormat::Toml => toml::from_str(text).map_err(|e| parse_error(e.to_string()))?,
        };

        let mut builder = DesiredShape::builder()
            .rules(raw.rules)
            .strict_intermediates(raw.strict_intermediates);
        if let Some(marker) = raw.marker {
            builder = builder.marker(marker);
        }
        let shape = builder.build().map_err(|source| ShapeFileError::Invalid {
            path: path.into(),
            source,
        })?;

        Ok(Self {
            key: raw.key,
            shape,
            events: raw.events,
        })
    }

    /// Load several files, failing on the first bad one
    ///
    /// # Errors
    /// See [`ShapeFile::load`]
    pub fn load_all<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Self>, ShapeFileError> {
        paths.iter().map(|p| Self::load(p.as_ref())).collect()
    }
}

impl From<ShapeFile> for Binding {
    fn from(file: ShapeFile) -> Self {
        Binding::new(file.key, file.shape).with_events(file.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_from_extension() {
        assert_eq!(ShapeFormat::from_path(Path::new("a.yml")), Some(ShapeFormat::Yaml));
        assert_eq!(ShapeFormat::from_path(Path::new("a.toml")), Some(ShapeFormat::Toml));
        assert_eq!(ShapeFormat::from_path(Path::new("a.txt")), None);
        assert_eq!(ShapeFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn toml_shape_file() {
        let text = r#"
key = "theme_mods"
events = ["theme_activated"]

[[rules]]
path = "layout.default"
default = "right-sidebar"

[[rules]]
path = ["nav", "menu.items"]
contains = "home"
"#;
        let file = ShapeFile::parse(text, ShapeFormat::Toml).unwrap();
        assert_eq!(file.key, "theme_mods");
        assert_eq!(file.events, vec![EventFilter::AnyThemeActivated]);
        assert_eq!(file.shape.rules()[0].default_ref(), Some(&json!("right-sidebar")));
        assert_eq!(file.shape.rules()[1].path().len(), 2);
    }

    #[test]
    fn json_shape_file_defaults_to_startup() {
        let text = r#"{"key": "pagination", "rules": [{"path": "posts_per_page", "default": 10}]}"#;
        let file = ShapeFile::parse(text, ShapeFormat::Json).unwrap();
        assert_eq!(file.events, vec![EventFilter::Startup]);
    }

    #[test]
    fn invalid_shape_reported() {
        let text = "key: k\nrules:\n  - path: a\n";
        let err = ShapeFile::parse(text, ShapeFormat::Yaml).unwrap_err();
        assert!(matches!(err, ShapeFileError::Invalid { .. }), "{err}");
    }

    #[test]
    fn bad_event_is_parse_error() {
        let text = "key: k\nevents: [shutdown]\nrules: []\n";
        let err = ShapeFile::parse(text, ShapeFormat::Yaml).unwrap_err();
        assert!(matches!(err, ShapeFileError::Parse { .. }), "{err}");
    }
}
