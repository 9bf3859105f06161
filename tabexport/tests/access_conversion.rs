//! End-to-end Access export tests through the mdbtools backend.
//!
//! Shell scripts stand in for `mdb-tables` and `mdb-export`, so no real
//! Access database or mdbtools installation is needed.

#![cfg(unix)]
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::uninlined_format_args)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tabexport::{
    AccessArgs, MdbToolsArgs, SelectionArgs, TablesArgs,
    convert::{export_access, source_tables},
    output::Reporter,
};
use tabexport_core::{BackendKind, BackendPreference, ExportStatus, TabExportError};

const FAKE_MDB_TABLES: &str = r#"#!/bin/sh
printf 'MSysObjects\nSites\nAsset Register\n~TMPCLP7\nArchive\n'
"#;

const FAKE_MDB_EXPORT: &str = r#"#!/bin/sh
case "$2" in
    Sites)
        printf 'SiteID,Name\n1,Depot\n2,"North, Yard"\n'
        ;;
    "Asset Register")
        printf 'AssetID,SiteID,Description\n10,1,Laptop\n11,2,"Forklift\nrecertified"\n12,2,Van\n'
        ;;
    Archive)
        printf 'AssetID,Retired\n'
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

struct Fixture {
    _dir: tempfile::TempDir,
    database: PathBuf,
    mdbtools: MdbToolsArgs,
}

impl Fixture {
    fn new() -> Self {
        Self::with_scripts(FAKE_MDB_TABLES, FAKE_MDB_EXPORT)
    }

    fn with_scripts(tables_script: &str, export_script: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir(&bin).unwrap();
        let mdb_tables = write_script(&bin, "mdb-tables", tables_script);
        let mdb_export = write_script(&bin, "mdb-export", export_script);

        let data = dir.path().join("data");
        std::fs::create_dir(&data).unwrap();
        let database = data.join("inventory.accdb");
        std::fs::write(&database, b"placeholder").unwrap();

        Self {
            _dir: dir,
            database,
            mdbtools: MdbToolsArgs {
                mdb_tables,
                mdb_export,
            },
        }
    }

    fn args(&self) -> AccessArgs {
        AccessArgs {
            database: Some(self.database.clone()),
            output: None,
            backend: BackendPreference::Auto,
            password_prompt: false,
            selection: SelectionArgs::default(),
            mdbtools: self.mdbtools.clone(),
        }
    }

    fn default_output(&self) -> PathBuf {
        self.database.parent().unwrap().join("access_export")
    }
}

#[tokio::test]
async fn test_access_conversion_exports_user_tables() {
    let fixture = Fixture::new();

    let report = export_access(&fixture.args(), Reporter::new(true))
        .await
        .unwrap();

    assert_eq!(report.backend, Some(BackendKind::MdbTools));
    assert_eq!(report.output_dir, fixture.default_output());
    let tables: Vec<&str> = report.exports.iter().map(|e| e.table.as_str()).collect();
    assert_eq!(tables, vec!["Sites", "Asset Register", "Archive"]);
    assert_eq!(report.summary.exported, 3);
    assert_eq!(report.summary.rows, 5);

    let out = fixture.default_output();
    assert_eq!(
        std::fs::read_to_string(out.join("Sites.csv")).unwrap(),
        "SiteID,Name\n1,Depot\n2,\"North, Yard\"\n"
    );
    assert!(out.join("Asset Register.csv").exists());
    assert!(!out.join("MSysObjects.csv").exists());
    assert!(!out.join("~TMPCLP7.csv").exists());
}

#[tokio::test]
async fn test_access_conversion_clashing_table_names_keep_both() {
    let fixture = Fixture::with_scripts(
        "#!/bin/sh\nprintf 'A/B\\nA_B\\n'\n",
        "#!/bin/sh\nprintf 'Name\\n%s\\n' \"$2\"\n",
    );

    let report = export_access(&fixture.args(), Reporter::new(true))
        .await
        .unwrap();
    assert_eq!(report.summary.exported, 2);

    let out = fixture.default_output();
    assert_eq!(std::fs::read_to_string(out.join("A_B.csv")).unwrap(), "Name\nA/B\n");
    assert_eq!(std::fs::read_to_string(out.join("A_B_2.csv")).unwrap(), "Name\nA_B\n");
}

#[tokio::test]
async fn test_access_conversion_skip_empty() {
    let fixture = Fixture::new();
    let mut args = fixture.args();
    args.selection.skip_empty = true;

    let report = export_access(&args, Reporter::new(true)).await.unwrap();

    let archive = report
        .exports
        .iter()
        .find(|e| e.table == "Archive")
        .unwrap();
    assert_eq!(archive.status, ExportStatus::SkippedEmpty);
    assert_eq!(report.summary.exported, 2);
    assert_eq!(report.summary.skipped, 1);
    assert!(!fixture.default_output().join("Archive.csv").exists());
}

#[tokio::test]
async fn test_access_conversion_named_table_and_output() {
    let fixture = Fixture::new();
    let out = fixture.database.parent().unwrap().join("picked");
    let mut args = fixture.args();
    args.output = Some(out.clone());
    args.selection.tables = vec!["Asset Register".to_string()];

    let report = export_access(&args, Reporter::new(true)).await.unwrap();

    assert_eq!(report.summary.total, 1);
    assert_eq!(
        report.exports[0].status,
        ExportStatus::Exported { rows: 3 }
    );
    assert!(out.join("Asset Register.csv").exists());
    assert!(!out.join("Sites.csv").exists());
}

#[tokio::test]
async fn test_access_conversion_unknown_table_lists_available() {
    let fixture = Fixture::new();
    let mut args = fixture.args();
    args.selection.tables = vec!["Vehicles".to_string()];

    let err = export_access(&args, Reporter::new(true))
        .await
        .unwrap_err();
    match err {
        TabExportError::TableNotFound { table, available } => {
            assert_eq!(table, "Vehicles");
            assert_eq!(available, vec!["Sites", "Asset Register", "Archive"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_access_conversion_missing_database() {
    let fixture = Fixture::new();
    let mut args = fixture.args();
    args.database = Some(fixture.database.with_file_name("missing.accdb"));

    let err = export_access(&args, Reporter::new(true))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Access database not found"));
}

#[tokio::test]
async fn test_access_conversion_without_backend() {
    let fixture = Fixture::new();
    let mut args = fixture.args();
    args.backend = BackendPreference::MdbTools;
    args.mdbtools.mdb_tables = PathBuf::from("tabexport-test-missing-mdb-tables");

    let err = export_access(&args, Reporter::new(true))
        .await
        .unwrap_err();
    match err {
        TabExportError::NoBackendAvailable { attempts } => {
            assert_eq!(attempts.len(), 1);
            assert_eq!(attempts[0].backend, BackendKind::MdbTools);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!fixture.default_output().exists());
}

#[tokio::test]
async fn test_tables_command_hides_system_tables() {
    let fixture = Fixture::new();
    let mut args = TablesArgs {
        source: fixture.database.clone(),
        backend: BackendPreference::Auto,
        include_system: false,
        password_prompt: false,
        mdbtools: fixture.mdbtools.clone(),
    };

    assert_eq!(
        source_tables(&args).await.unwrap(),
        vec!["Sites", "Asset Register", "Archive"]
    );

    args.include_system = true;
    assert_eq!(source_tables(&args).await.unwrap().len(), 5);
}
