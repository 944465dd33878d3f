use optsync_blob::{ConfigBlob, ShapePath};
use optsync_reconcile::{presets, reconcile, DesiredShape, TimeUnit};
use pretty_assertions::assert_eq;
use serde_json::json;

const SIDEBAR_YAML: &str = r#"
rules:
  - path: sidebars_widgets.data.sidebar-2
    contains: search-2
  - path: [theme_mods, "custom.logo"]
    default: null
marker:
  path: sidebars_widgets.time
"#;

#[test]
fn test_yaml_shape_parses_and_applies() {
    let shape: DesiredShape = serde_yaml::from_str(SIDEBAR_YAML).unwrap();
    assert_eq!(shape.rules().len(), 2);
    assert_eq!(
        shape.rules()[1].path(),
        &ShapePath::of(["theme_mods", "custom.logo"])
    );
    assert_eq!(shape.marker().unwrap().unit, TimeUnit::Seconds);

    let current = ConfigBlob::from_value(json!({"blogname": "Example"})).unwrap();
    let result = reconcile(&current, &shape).unwrap();
    let blob = result.into_owned();

    assert_eq!(blob.get(&ShapePath::single("blogname")), Some(&json!("Example")));
    assert_eq!(
        blob.get(&ShapePath::of(["theme_mods", "custom.logo"])),
        Some(&json!(null))
    );
    assert_eq!(
        blob.get(&"sidebars_widgets.data.sidebar-2".parse().unwrap()),
        Some(&json!(["search-2"]))
    );
}

#[test]
fn test_invalid_yaml_shape_is_rejected() {
    let doc = r#"
rules:
  - path: a.b
    contains: x
    default: "not a list"
"#;
    let err = serde_yaml::from_str::<DesiredShape>(doc).unwrap_err();
    assert!(err.to_string().contains("not a sequence"), "{err}");
}

#[test]
fn test_unknown_rule_field_is_rejected() {
    let doc = r#"
rules:
  - path: a
    defualt: 1
"#;
    assert!(serde_yaml::from_str::<DesiredShape>(doc).is_err());
}

#[test]
fn test_presets_survive_serialization() {
    for shape in [
        presets::sidebar_widget("sidebar-1", "search-2"),
        presets::layout_defaults("right-sidebar"),
        presets::pagination(10),
    ] {
        let text = serde_yaml::to_string(&shape).unwrap();
        let back: DesiredShape = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back, shape);
    }
}

#[test]
fn test_presets_merge_into_one_record_shape() {
    let shape = presets::layout_defaults("left-sidebar")
        .merge(&presets::pagination(12))
        .unwrap();
    let empty = ConfigBlob::new();
    let result = reconcile(&empty, &shape).unwrap();
    assert_eq!(
        result.into_owned(),
        ConfigBlob::from_value(json!({
            "layout": {"default": "left-sidebar", "sidebar_position": "left"},
            "pagination": {"posts_per_page": 12, "style": "numbered"}
        }))
        .unwrap()
    );
}
