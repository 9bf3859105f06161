//! mdbtools backend tests using shell-script stand-ins for `mdb-tables` and
//! `mdb-export`.
//!
//! The scripts print what the real tools print for a small inventory
//! database, so these tests run without mdbtools installed.

#![cfg(unix)]
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::uninlined_format_args)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tabexport_core::{
    BackendConfig, BackendKind, BackendPreference, ExportConfig, ExportStatus, MdbToolsConfig,
    SourceBackend, TabExportError, TableFilter, backends::mdbtools::MdbToolsBackend, export_one,
    select_backend, table_output_path,
};

const FAKE_MDB_TABLES: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
    echo "mdbtools v1.0.0"
    exit 0
fi
printf 'MSysObjects\nAssets\nOld Items\n~TMPCLP12\nScratch\n'
"#;

const FAKE_MDB_EXPORT: &str = r#"#!/bin/sh
case "$2" in
    Assets)
        printf 'ID,Name,Notes\n1,Laptop,"bought 2023\nwarranty 3y"\n2,Monitor,\n'
        ;;
    "Old Items")
        printf 'ID,Name\n7,"Desk, oak"\n'
        ;;
    Scratch)
        printf 'ID,Value\n'
        ;;
    *)
        echo "Error: Table $2 does not exist in this database." >&2
        exit 1
        ;;
esac
"#;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    let mut permissions = std::fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&path, permissions).unwrap();
    path
}

/// Creates the fake tools plus a placeholder database file.
fn fixture(dir: &Path) -> (PathBuf, MdbToolsConfig) {
    let tables = write_script(dir, "mdb-tables", FAKE_MDB_TABLES);
    let export = write_script(dir, "mdb-export", FAKE_MDB_EXPORT);
    let db = dir.join("inventory.accdb");
    std::fs::write(&db, b"placeholder").unwrap();

    let config = MdbToolsConfig::new()
        .with_tables_program(tables)
        .with_export_program(export);
    (db, config)
}

// ============================================================================
// Probing and enumeration
// ============================================================================

#[tokio::test]
async fn test_mdbtools_probe_and_list_tables() {
    let dir = tempfile::tempdir().unwrap();
    let (db, config) = fixture(dir.path());

    let backend = MdbToolsBackend::new(&db, config);
    backend.probe().await.unwrap();
    assert_eq!(
        backend.list_tables().await.unwrap(),
        vec!["MSysObjects", "Assets", "Old Items", "~TMPCLP12", "Scratch"]
    );
}

#[tokio::test]
async fn test_mdbtools_access_filter_drops_system_tables() {
    let dir = tempfile::tempdir().unwrap();
    let (db, config) = fixture(dir.path());

    let backend = MdbToolsBackend::new(&db, config);
    let tables = TableFilter::for_access()
        .apply(backend.list_tables().await.unwrap())
        .unwrap();
    assert_eq!(tables, vec!["Assets", "Old Items", "Scratch"]);
}

#[tokio::test]
async fn test_mdbtools_selected_for_access_database() {
    let dir = tempfile::tempdir().unwrap();
    let (db, mdbtools) = fixture(dir.path());
    let config = BackendConfig::new().with_mdbtools(mdbtools);

    let backend = select_backend(&db, BackendPreference::Auto, &config)
        .await
        .unwrap();
    assert_eq!(backend.backend_kind(), BackendKind::MdbTools);
}

#[tokio::test]
async fn test_mdbtools_missing_tools_reports_every_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("inventory.mdb");
    std::fs::write(&db, b"placeholder").unwrap();
    let config = BackendConfig::new().with_mdbtools(
        MdbToolsConfig::new().with_tables_program(dir.path().join("no-such-mdb-tables")),
    );

    let err = select_backend(&db, BackendPreference::Auto, &config)
        .await
        .err()
        .unwrap();
    match err {
        TabExportError::NoBackendAvailable { attempts } => {
            assert_eq!(attempts[0].backend, BackendKind::MdbTools);
            assert!(attempts[0].reason.contains("not found on PATH"));
            assert_eq!(attempts.len(), BackendPreference::Auto.access_candidates().len());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// ============================================================================
// Export
// ============================================================================

#[tokio::test]
async fn test_mdbtools_export_counts_records_not_lines() {
    let dir = tempfile::tempdir().unwrap();
    let (db, config) = fixture(dir.path());
    let destination = dir.path().join("Assets.csv");

    let backend = MdbToolsBackend::new(&db, config);
    let rows = backend.export_table("Assets", &destination).await.unwrap();
    assert_eq!(rows, 2);

    let content = std::fs::read_to_string(&destination).unwrap();
    assert!(content.starts_with("ID,Name,Notes\n"));
    assert!(content.contains("\"bought 2023\nwarranty 3y\""));
}

#[tokio::test]
async fn test_mdbtools_table_name_with_space() {
    let dir = tempfile::tempdir().unwrap();
    let (db, config) = fixture(dir.path());
    let destination = table_output_path(dir.path(), "Old Items");

    let backend = MdbToolsBackend::new(&db, config);
    let export = export_one(
        &backend,
        &db,
        "Old Items",
        destination.clone(),
        &ExportConfig::default(),
    )
    .await;

    assert_eq!(export.status, ExportStatus::Exported { rows: 1 });
    assert_eq!(
        std::fs::read_to_string(destination).unwrap(),
        "ID,Name\n7,\"Desk, oak\"\n"
    );
}

#[tokio::test]
async fn test_mdbtools_header_only_table() {
    let dir = tempfile::tempdir().unwrap();
    let (db, config) = fixture(dir.path());
    let backend = MdbToolsBackend::new(&db, config);

    let kept = export_one(
        &backend,
        &db,
        "Scratch",
        dir.path().join("Scratch.csv"),
        &ExportConfig::default(),
    )
    .await;
    assert_eq!(kept.status, ExportStatus::Exported { rows: 0 });
    assert!(kept.output.exists());

    let skipped = export_one(
        &backend,
        &db,
        "Scratch",
        dir.path().join("Scratch-skip.csv"),
        &ExportConfig::new().with_skip_empty(true),
    )
    .await;
    assert_eq!(skipped.status, ExportStatus::SkippedEmpty);
    assert!(!skipped.output.exists());
}

#[tokio::test]
async fn test_mdbtools_export_failure_carries_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let (db, config) = fixture(dir.path());
    let backend = MdbToolsBackend::new(&db, config);

    let export = export_one(
        &backend,
        &db,
        "Ghost",
        dir.path().join("Ghost.csv"),
        &ExportConfig::default(),
    )
    .await;

    match &export.status {
        ExportStatus::Failed { error } => {
            assert!(error.contains("Ghost"), "got {error}");
            assert!(error.contains("does not exist"), "got {error}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}
