//! Subcommand implementations

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use optsync_core::{Binding, ShapeFile, SyncConfig, SyncOutcome, SyncReport, Synchronizer};
use optsync_store::{FileStore, SettingsStore};

/// Options shared by `ensure` and `check`
#[derive(Debug, Clone)]
pub(crate) struct SyncArgs {
    pub(crate) store: PathBuf,
    pub(crate) shapes: Vec<PathBuf>,
    pub(crate) config: SyncConfig,
}

/// Reconcile every record named by the shape files
pub(crate) async fn sync(args: &SyncArgs) -> Result<SyncReport> {
    let files = ShapeFile::load_all(&args.shapes)?;
    let store = FileStore::open(&args.store)
        .with_context(|| format!("opening store {}", args.store.display()))?;

    let mut synchronizer = Synchronizer::new(Arc::new(store)).with_config(args.config.clone());
    for file in files {
        synchronizer.register(Binding::from(file));
    }
    Ok(synchronizer.ensure_all().await)
}

/// Print one line per binding
pub(crate) fn print_report(out: &mut impl Write, report: &SyncReport) -> Result<()> {
    for entry in &report.entries {
        match &entry.result {
            Ok(outcome) => {
                writeln!(out, "{}: {outcome}", entry.key)?;
                if let SyncOutcome::Written { edits } | SyncOutcome::WouldWrite { edits } = outcome {
                    for edit in edits {
                        writeln!(out, "  {edit}")?;
                    }
                }
            }
            Err(error) => writeln!(out, "{}: failed: {error}", entry.key)?,
        }
    }
    Ok(())
}

/// Whether `check` should report failure
pub(crate) fn needs_attention(report: &SyncReport) -> bool {
    !report.is_converged()
}

/// Whether `ensure` should report failure
pub(crate) fn has_errors(report: &SyncReport) -> bool {
    report.failures().next().is_some() || report.conflicts() > 0
}

/// Pretty JSON of one record
pub(crate) async fn show(store: &Path, key: &str) -> Result<String> {
    let store = FileStore::open(store)?;
    let record = store
        .get(key)
        .await?
        .with_context(|| format!("no record named '{key}'"))?;
    Ok(record.to_json_pretty()?)
}

/// Keys of all records
pub(crate) async fn list(store: &Path) -> Result<Vec<String>> {
    Ok(FileStore::open(store)?.keys().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use optsync_blob::ConfigBlob;
    use std::fs;

    const PAGINATION: &str = "key: theme_mods\nrules:\n  - path: pagination.posts_per_page\n    default: 10\n";

    fn setup() -> (tempfile::TempDir, SyncArgs) {
        let dir = tempfile::tempdir().unwrap();
        let shape = dir.path().join("pagination.yaml");
        fs::write(&shape, PAGINATION).unwrap();
        let args = SyncArgs {
            store: dir.path().join("store"),
            shapes: vec![shape],
            config: SyncConfig::default(),
        };
        (dir, args)
    }

    #[tokio::test]
    async fn check_then_ensure_then_check() {
        let (_dir, mut args) = setup();

        args.config.dry_run = true;
        let report = sync(&args).await.unwrap();
        assert!(needs_attention(&report));
        assert!(list(&args.store).await.unwrap().is_empty());

        args.config.dry_run = false;
        let report = sync(&args).await.unwrap();
        assert!(!has_errors(&report));
        let mut out = Vec::new();
        print_report(&mut out, &report).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("theme_mods: written"), "{text}");

        args.config.dry_run = true;
        assert!(!needs_attention(&sync(&args).await.unwrap()));
    }

    #[tokio::test]
    async fn show_prints_record() {
        let (_dir, args) = setup();
        sync(&args).await.unwrap();

        let json = show(&args.store, "theme_mods").await.unwrap();
        let record = ConfigBlob::from_json(&json).unwrap();
        assert!(record.contains(&"pagination.posts_per_page".parse().unwrap()));
        assert!(show(&args.store, "missing").await.is_err());
    }

    #[tokio::test]
    async fn conflicts_are_errors_for_ensure() {
        let (dir, mut args) = setup();
        let store = dir.path().join("store");
        fs::create_dir_all(&store).unwrap();
        fs::write(store.join("theme_mods.json"), r#"{"pagination": 5}"#).unwrap();
        let strict = dir.path().join("strict.yaml");
        fs::write(
            &strict,
            "key: theme_mods\nstrict_intermediates: true\nrules:\n  - path: pagination.style\n    default: numbered\n",
        )
        .unwrap();
        args.shapes = vec![strict];

        let report = sync(&args).await.unwrap();
        assert!(has_errors(&report));
    }
}
