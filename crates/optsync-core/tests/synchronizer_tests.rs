use std::sync::Arc;

use optsync_core::{
    Binding, EventFilter, LifecycleEvent, ShapeFile, SyncConfig, SyncError, SyncOutcome,
    Synchronizer,
};
use optsync_reconcile::{presets, Edit};
use optsync_store::{FileStore, MemoryStore, SettingsStore};
use optsync_test_utils::{
    blob, fixed_reconciler, membership_shape, path, sidebars_record, stamped_default_shape,
    CountingStore, FailingStore, MeddlingStore, FIXED_NOW_MILLIS,
};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_writes_only_on_divergence() {
    let store = Arc::new(CountingStore::with_records([("sidebars", sidebars_record())]));
    let sync = Synchronizer::new(Arc::clone(&store))
        .with_reconciler(fixed_reconciler())
        .bind(Binding::new("sidebars", presets::sidebar_widget("sidebar-1", "search-2")));

    let report = sync.dispatch(&LifecycleEvent::Startup).await;
    assert!(report.is_converged());
    assert_eq!(store.writes(), 0);

    let sync = sync.bind(Binding::new(
        "sidebars",
        presets::sidebar_widget("sidebar-2", "search-2"),
    ));
    let report = sync.dispatch(&LifecycleEvent::Startup).await;
    assert_eq!(report.written(), 1);
    assert_eq!(store.writes(), 1);

    let record = store.get("sidebars").await.unwrap().unwrap();
    assert_eq!(
        record.get(&path("sidebars_widgets.data.sidebar-2")),
        Some(&json!(["search-2"]))
    );
    assert_eq!(
        record.get(&path("sidebars_widgets.time")),
        Some(&json!(FIXED_NOW_MILLIS / 1000))
    );
    assert_eq!(record.get(&path("array_version")), Some(&json!(3)));
}

#[tokio::test]
async fn test_conflict_leaves_record_untouched() {
    let original = blob(json!({"menu": {"items": "home"}}));
    let store = Arc::new(CountingStore::with_records([("nav", original.clone())]));
    let sync = Synchronizer::new(Arc::clone(&store))
        .bind(Binding::new("nav", membership_shape("menu.items", "about")));

    let report = sync.dispatch(&LifecycleEvent::Startup).await;
    assert_eq!(report.conflicts(), 1);
    assert_eq!(store.writes(), 0);
    assert_eq!(store.get("nav").await.unwrap(), Some(original));
}

#[tokio::test]
async fn test_dry_run_never_writes() {
    let store = Arc::new(CountingStore::default());
    let sync = Synchronizer::new(Arc::clone(&store))
        .with_config(SyncConfig::default().with_dry_run(true))
        .bind(Binding::new("theme_mods", presets::pagination(10)));

    let report = sync.dispatch(&LifecycleEvent::Startup).await;
    let (_, outcome) = report.outcomes().next().unwrap();
    assert!(matches!(outcome, SyncOutcome::WouldWrite { .. }));
    assert_eq!(outcome.edits().len(), 3);
    assert_eq!(store.writes(), 0);
    assert!(store.get("theme_mods").await.unwrap().is_none());
}

#[tokio::test]
async fn test_dispatch_runs_only_matching_bindings() {
    let store = Arc::new(MemoryStore::new());
    let sync = Synchronizer::new(Arc::clone(&store))
        .bind(Binding::new("boot", presets::pagination(10)))
        .bind(
            Binding::new("twenty", presets::layout_defaults("right-sidebar"))
                .with_events([EventFilter::ThemeActivated("twentytwenty".into())]),
        )
        .bind(
            Binding::new("any_theme", presets::layout_defaults("left-sidebar"))
                .with_events([EventFilter::AnyThemeActivated]),
        );

    let report = sync
        .dispatch(&LifecycleEvent::ThemeActivated("blocksy".into()))
        .await;
    let keys: Vec<&str> = report.outcomes().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["any_theme"]);
    assert_eq!(store.keys().await.unwrap(), vec!["any_theme"]);

    let report = sync
        .dispatch(&LifecycleEvent::ThemeActivated("twentytwenty".into()))
        .await;
    assert_eq!(report.len(), 2);
}

#[tokio::test]
async fn test_failing_store_does_not_abort_dispatch() {
    let sync = Synchronizer::new(Arc::new(FailingStore))
        .bind(Binding::new("a", presets::pagination(10)))
        .bind(Binding::new("b", presets::pagination(20)));

    let report = sync.dispatch(&LifecycleEvent::Startup).await;
    assert_eq!(report.len(), 2);
    assert_eq!(report.failures().count(), 2);
    assert!(report
        .failures()
        .all(|(_, e)| matches!(e, SyncError::StoreUnavailable(_))));
}

#[tokio::test]
async fn test_lost_race_is_retried() {
    let store = Arc::new(MeddlingStore::new(2));
    let sync = Synchronizer::new(Arc::clone(&store))
        .with_reconciler(fixed_reconciler())
        .bind(Binding::new("k", stamped_default_shape("a.b", json!(1))));

    let outcome = sync.ensure(&sync.bindings()[0]).await.unwrap();
    assert!(matches!(outcome, SyncOutcome::Written { .. }));

    let record = store.get("k").await.unwrap().unwrap();
    assert_eq!(record.get(&path("a.b")), Some(&json!(1)));
    assert_eq!(record.get(&path("outside_writer")), Some(&json!(1)));
}

#[tokio::test]
async fn test_exhausted_retries_are_contended() {
    let store = Arc::new(MeddlingStore::new(usize::MAX));
    let sync = Synchronizer::new(store).with_config(SyncConfig {
        max_cas_retries: 2,
        dry_run: false,
    });
    let binding = Binding::new("k", presets::pagination(10));

    let err = sync.ensure(&binding).await.unwrap_err();
    assert!(matches!(err, SyncError::Contended { attempts: 3, .. }), "{err}");
}

#[tokio::test]
async fn test_concurrent_ensures_converge() {
    let store = Arc::new(CountingStore::default());
    let sync = Arc::new(
        Synchronizer::new(Arc::clone(&store))
            .with_reconciler(fixed_reconciler())
            .bind(Binding::new("sidebars", presets::sidebar_widget("sidebar-1", "search-2")))
            .bind(Binding::new("sidebars", presets::sidebar_widget("sidebar-1", "archives-2")))
            .bind(Binding::new("sidebars", presets::sidebar_widget("sidebar-2", "meta-2"))),
    );

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let sync = Arc::clone(&sync);
            tokio::spawn(async move { sync.dispatch(&LifecycleEvent::Startup).await })
        })
        .collect();
    for handle in handles {
        let report = handle.await.unwrap();
        assert_eq!(report.failures().count(), 0);
    }

    let record = store.get("sidebars").await.unwrap().unwrap();
    assert_eq!(
        record.get(&path("sidebars_widgets.data.sidebar-1")),
        Some(&json!(["search-2", "archives-2"]))
    );
    assert_eq!(
        record.get(&path("sidebars_widgets.data.sidebar-2")),
        Some(&json!(["meta-2"]))
    );
    assert_eq!(store.writes(), 3);
}

#[tokio::test]
async fn test_shape_files_drive_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let shapes = dir.path().join("shapes");
    std::fs::create_dir(&shapes).unwrap();
    let file = shapes.join("widgets.yaml");
    std::fs::write(
        &file,
        "key: sidebars_widgets\nrules:\n  - path: data.sidebar-2\n    contains: search-2\nmarker:\n  path: time\n",
    )
    .unwrap();

    let store = Arc::new(FileStore::open(dir.path().join("records")).unwrap());
    let sync = Synchronizer::new(Arc::clone(&store))
        .with_reconciler(fixed_reconciler())
        .bind(ShapeFile::load(&file).unwrap().into());

    let report = sync.dispatch(&LifecycleEvent::Startup).await;
    let (_, outcome) = report.outcomes().next().unwrap();
    assert_eq!(
        outcome.edits().last(),
        Some(&Edit::BumpedMarker {
            path: path("time"),
            value: FIXED_NOW_MILLIS / 1000
        })
    );
    assert_eq!(
        store.get("sidebars_widgets").await.unwrap(),
        Some(blob(json!({"data": {"sidebar-2": ["search-2"]}, "time": FIXED_NOW_MILLIS / 1000})))
    );
}
