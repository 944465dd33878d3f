//! Built-in shapes for common theme settings

use optsync_blob::{ShapePath, Value};

use crate::shape::{DesiredShape, FreshnessMarker, ShapeRule};

/// Record key holding widget placement
pub const SIDEBARS_WIDGETS: &str = "sidebars_widgets";

/// Ensure `widget` is placed in `sidebar`
///
/// Targets `sidebars_widgets.data.<sidebar>` and bumps
/// `sidebars_widgets.time` (Unix seconds) when the placement changes.
#[must_use]
pub fn sidebar_widget(sidebar: &str, widget: &str) -> DesiredShape {
    DesiredShape {
        rules: vec![ShapeRule::containing(
            ShapePath::of([SIDEBARS_WIDGETS, "data", sidebar]),
            Value::from(widget),
        )],
        marker: Some(FreshnessMarker::seconds(ShapePath::of([
            SIDEBARS_WIDGETS,
            "time",
        ]))),
        strict_intermediates: false,
    }
}

/// Ensure a default layout and matching sidebar position exist
///
/// The position is derived from the layout name: `left-sidebar` gives
/// `left`, `right-sidebar` gives `right`, anything else gives `none`.
#[must_use]
pub fn layout_defaults(layout: &str) -> DesiredShape {
    let position = match layout {
        l if l.starts_with("left") => "left",
        l if l.starts_with("right") => "right",
        _ => "none",
    };
    DesiredShape {
        rules: vec![
            ShapeRule::with_default(ShapePath::of(["layout", "default"]), Value::from(layout)),
            ShapeRule::with_default(
                ShapePath::of(["layout", "sidebar_position"]),
                Value::from(position),
            ),
        ],
        marker: None,
        strict_intermediates: false,
    }
}

/// Ensure pagination settings exist
#[must_use]
pub fn pagination(per_page: u32) -> DesiredShape {
    DesiredShape {
        rules: vec![
            ShapeRule::with_default(
                ShapePath::of(["pagination", "posts_per_page"]),
                Value::from(per_page),
            ),
            ShapeRule::with_default(ShapePath::of(["pagination", "style"]), Value::from("numbered")),
        ],
        marker: None,
        strict_intermediates: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::reconcile;
    use optsync_blob::ConfigBlob;
    use serde_json::json;

    #[test]
    fn sidebar_widget_places_and_stamps() {
        let current = ConfigBlob::from_value(json!({
            "sidebars_widgets": {"data": {"sidebar-1": ["recent-posts-2"]}}
        }))
        .unwrap();
        let result = reconcile(&current, &sidebar_widget("sidebar-2", "search-2")).unwrap();

        let blob = result.blob.as_ref();
        assert_eq!(
            blob.get(&"sidebars_widgets.data.sidebar-2".parse().unwrap()),
            Some(&json!(["search-2"]))
        );
        assert_eq!(
            blob.get(&"sidebars_widgets.data.sidebar-1".parse().unwrap()),
            Some(&json!(["recent-posts-2"]))
        );
        assert!(blob
            .get(&"sidebars_widgets.time".parse().unwrap())
            .is_some_and(Value::is_i64));
    }

    #[test]
    fn layout_position_follows_layout() {
        let shape = layout_defaults("left-sidebar");
        assert_eq!(shape.rules()[1].default_ref(), Some(&json!("left")));
        assert_eq!(
            layout_defaults("full-width").rules()[1].default_ref(),
            Some(&json!("none"))
        );
    }

    #[test]
    fn pagination_keeps_existing_values() {
        let current = ConfigBlob::from_value(json!({"pagination": {"posts_per_page": 25}})).unwrap();
        let result = reconcile(&current, &pagination(10)).unwrap();
        assert_eq!(
            result.blob.as_ref(),
            &ConfigBlob::from_value(json!({
                "pagination": {"posts_per_page": 25, "style": "numbered"}
            }))
            .unwrap()
        );
    }
}
