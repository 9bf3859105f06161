//! mdbtools backend: Access databases through `mdb-tables` and `mdb-export`.
//!
//! Works on Linux and macOS without Microsoft's drivers. Table names are
//! requested one per line (`mdb-tables -1`) so names containing spaces
//! survive. `mdb-export` already produces RFC 4180 CSV with a header row, so
//! its output is written to the destination unchanged.

use super::{BackendFeature, MdbToolsConfig, SourceBackend};
use crate::{Result, error::TabExportError, export::count_csv_records, models::BackendKind};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

/// Reads Access databases with the mdbtools command-line utilities.
#[derive(Debug, Clone)]
pub struct MdbToolsBackend {
    path: PathBuf,
    config: MdbToolsConfig,
}

impl MdbToolsBackend {
    /// Creates a backend for the database at `path`.
    pub fn new(path: impl Into<PathBuf>, config: MdbToolsConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    /// Runs `mdb-tables -1 <db>` and returns its output.
    async fn run_tables(&self) -> Result<Output> {
        let program = &self.config.tables_program;
        debug!("Running {} -1 {}", program.display(), self.path.display());

        Command::new(program)
            .arg("-1")
            .arg(&self.path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| spawn_error(program, e))
    }
}

/// Maps a spawn failure: a missing program means the backend is unavailable.
fn spawn_error(program: &Path, error: std::io::Error) -> TabExportError {
    if error.kind() == ErrorKind::NotFound {
        TabExportError::backend_unavailable(
            BackendKind::MdbTools,
            format!("{} not found on PATH", program.display()),
        )
    } else {
        TabExportError::backend_unavailable(
            BackendKind::MdbTools,
            format!("cannot run {}: {}", program.display(), error),
        )
    }
}

/// Trimmed stderr, or the exit status when stderr is empty.
fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}

/// Parses `mdb-tables -1` output: one name per line, blanks dropped.
pub fn parse_table_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Returns true if the `mdb-tables` program can be started.
pub async fn tools_available(config: &MdbToolsConfig) -> bool {
    // Any exit status counts; only a failed spawn means the tool is missing.
    Command::new(&config.tables_program)
        .arg("--version")
        .kill_on_drop(true)
        .output()
        .await
        .is_ok()
}

#[async_trait]
impl SourceBackend for MdbToolsBackend {
    async fn probe(&self) -> Result<()> {
        if !self.path.is_file() {
            return Err(TabExportError::configuration(format!(
                "Access database not found: {}",
                self.path.display()
            )));
        }

        let output = self.run_tables().await?;
        if !output.status.success() {
            return Err(TabExportError::backend_unavailable(
                BackendKind::MdbTools,
                format!("cannot read database: {}", failure_message(&output)),
            ));
        }
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let output = self.run_tables().await?;
        if !output.status.success() {
            return Err(TabExportError::source_open(
                format!("{} failed", self.config.tables_program.display()),
                std::io::Error::other(failure_message(&output)),
            ));
        }
        Ok(parse_table_list(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn export_table(&self, table: &str, destination: &Path) -> Result<u64> {
        let program = &self.config.export_program;
        debug!(
            "Running {} {} {}",
            program.display(),
            self.path.display(),
            table
        );

        let output = Command::new(program)
            .arg(&self.path)
            .arg(table)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| spawn_error(program, e))?;

        if !output.status.success() {
            return Err(TabExportError::ExportTool {
                table: table.to_string(),
                message: failure_message(&output),
            });
        }

        tokio::fs::write(destination, &output.stdout)
            .await
            .map_err(|e| {
                TabExportError::io(format!("Failed to write {}", destination.display()), e)
            })?;

        let destination = destination.to_path_buf();
        tokio::task::spawn_blocking(move || count_csv_records(&destination))
            .await
            .map_err(|e| TabExportError::table_read(table, "row count task failed", e))?
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::MdbTools
    }

    fn supports_feature(&self, feature: BackendFeature) -> bool {
        matches!(
            feature,
            BackendFeature::TableEnumeration | BackendFeature::HeaderFromSchema
        )
        // mdbtools cannot open password-protected databases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table_list() {
        let stdout = "MSysObjects\nAssets\n\n  Vehicle List  \r\n~TMPCLP1\n";
        assert_eq!(
            parse_table_list(stdout),
            vec!["MSysObjects", "Assets", "Vehicle List", "~TMPCLP1"]
        );
        assert!(parse_table_list("").is_empty());
    }

    #[tokio::test]
    async fn test_missing_program_is_backend_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("inventory.accdb");
        std::fs::write(&db, b"not really a database").unwrap();

        let config = MdbToolsConfig::new().with_tables_program("tabexport-no-such-mdb-tables");
        let backend = MdbToolsBackend::new(&db, config);

        let err = backend.probe().await.unwrap_err();
        assert!(err.is_backend_unavailable(), "got {err:?}");
        assert!(err.to_string().contains("not found on PATH"));
    }

    #[tokio::test]
    async fn test_probe_missing_database_file() {
        let backend = MdbToolsBackend::new("/nonexistent/inventory.accdb", MdbToolsConfig::new());
        let err = backend.probe().await.unwrap_err();
        assert!(err.to_string().contains("Access database not found"));
    }

    #[tokio::test]
    async fn test_tools_available_false_for_missing_program() {
        let config = MdbToolsConfig::new().with_tables_program("tabexport-no-such-mdb-tables");
        assert!(!tools_available(&config).await);
    }
}
