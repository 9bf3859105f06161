//! User-facing progress lines and report files.
//!
//! Progress goes to stdout so it can be piped or captured; `--quiet`
//! silences it except for failed items, which still reach stderr.
//! Diagnostics stay on `tracing` (stderr).

use std::path::Path;
use tabexport_core::{
    BackendAttempt, BackendKind, ConversionReport, ExportStatus, Result, TabExportError,
    TableExport,
};

/// Prints progress lines unless quiet.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    quiet: bool,
}

impl Reporter {
    /// Creates a reporter; `quiet` hides everything but failures.
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Prints one line.
    pub fn line(&self, message: impl std::fmt::Display) {
        if !self.quiet {
            println!("{}", message);
        }
    }

    /// Prints an empty separator line.
    pub fn blank(&self) {
        if !self.quiet {
            println!();
        }
    }

    /// Prints the result `line` for one export.
    ///
    /// When quiet, a failure is still reported on stderr, naming the item
    /// since its progress line was hidden.
    pub fn export_result(&self, export: &TableExport, line: impl std::fmt::Display) {
        if !self.quiet {
            println!("{}", line);
        } else if let Some(failure) = quiet_line(export) {
            eprintln!("{}", failure);
        }
    }
}

/// The line `--quiet` keeps for one export: failures only.
pub fn quiet_line(export: &TableExport) -> Option<String> {
    match &export.status {
        ExportStatus::Failed { error } => Some(format!(
            "❌ {} ({}): {}",
            export.table,
            export.source.display(),
            error
        )),
        _ => None,
    }
}

/// Result line for one workbook or sheet, e.g. `  ✅ Success (12 rows)`.
pub fn format_status(status: &ExportStatus, empty_label: &str) -> String {
    match status {
        ExportStatus::Exported { rows } => format!("  ✅ Success ({} rows)", rows),
        ExportStatus::SkippedEmpty => format!("  ⚠️  {} is empty", empty_label),
        ExportStatus::Failed { error } => format!("  ❌ Error: {}", error),
    }
}

/// Result line for one Access table, e.g. `  ✅ Exported 12 rows`.
pub fn format_table_status(status: &ExportStatus) -> String {
    match status {
        ExportStatus::Exported { rows } => format!("  ✅ Exported {} rows", rows),
        other => format_status(other, "Table"),
    }
}

/// Installation hints printed when no backend can read an Access database.
pub fn backend_hints(attempts: &[BackendAttempt]) -> Vec<String> {
    let mut lines = vec!["❌ No method available to read Access database".to_string()];
    lines.push(String::new());
    lines.push("Tried:".to_string());
    for attempt in attempts {
        lines.push(format!("  - {}", attempt));
    }
    lines.push(String::new());
    lines.push("Options:".to_string());
    lines.push(
        "1. Install mdbtools (apt install mdbtools, dnf install mdbtools, brew install mdbtools)"
            .to_string(),
    );
    lines.push(
        "2. Install the Microsoft Access Database Engine and rebuild with --features odbc"
            .to_string(),
    );
    lines.push("3. Export the tables from Access on a machine that has it".to_string());
    lines
}

/// Lines printed to stderr for a failed run.
///
/// Installation hints are only useful when the attempts were Access
/// backends; a workbook calamine cannot open gets the plain error.
pub fn error_lines(error: &TabExportError) -> Vec<String> {
    match error {
        TabExportError::NoBackendAvailable { attempts }
            if !attempts.is_empty()
                && attempts
                    .iter()
                    .all(|a| matches!(a.backend, BackendKind::MdbTools | BackendKind::Odbc)) =>
        {
            backend_hints(attempts)
        }
        other => vec![format!("Error: {}", other)],
    }
}

/// Writes the report as pretty-printed JSON.
pub async fn save_report(report: &ConversionReport, path: &Path) -> Result<()> {
    let json_data =
        serde_json::to_string_pretty(report).map_err(|e| TabExportError::Serialization {
            context: "conversion report".to_string(),
            source: e,
        })?;

    tokio::fs::write(path, json_data)
        .await
        .map_err(|e| TabExportError::io(format!("Failed to write to {}", path.display()), e))?;

    tracing::info!("Report saved to {}", path.display());
    Ok(())
}
