//! Core data models for sources, backends and export results.
//!
//! A conversion run produces one `TableExport` per table or sheet. The
//! `ConversionReport` collects them together with run metadata and can be
//! serialized to JSON.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Extensions opened as spreadsheets.
pub const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb"];

/// Extensions opened as Access databases.
pub const ACCESS_EXTENSIONS: &[&str] = &["accdb", "mdb"];

/// Kind of source file, decided by extension only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Excel workbook (`.xlsx`, `.xlsm`, `.xls`, `.xlsb`)
    Workbook,
    /// Access database (`.accdb`, `.mdb`)
    AccessDatabase,
}

impl SourceKind {
    /// Classifies a path by its (case-insensitive) extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::Workbook)
        } else if ACCESS_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::AccessDatabase)
        } else {
            None
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Workbook => write!(f, "workbook"),
            SourceKind::AccessDatabase => write!(f, "Access database"),
        }
    }
}

/// Backends able to read a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Built-in workbook reader
    Spreadsheet,
    /// `mdb-tables` / `mdb-export`
    MdbTools,
    /// Microsoft Access ODBC driver
    Odbc,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Spreadsheet => write!(f, "spreadsheet"),
            BackendKind::MdbTools => write!(f, "mdbtools"),
            BackendKind::Odbc => write!(f, "ODBC"),
        }
    }
}

/// Outcome of exporting one table or sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportStatus {
    /// CSV written with the given number of data rows (header excluded)
    Exported { rows: u64 },
    /// Table had no rows and empty tables were being skipped
    SkippedEmpty,
    /// Export failed; the message is safe to display
    Failed { error: String },
}

/// Record of a single table or sheet export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableExport {
    /// Workbook or database file the table came from
    pub source: PathBuf,
    /// Table or sheet name as reported by the backend
    pub table: String,
    /// CSV file written (or that would have been written)
    pub output: PathBuf,
    /// Outcome of the export
    pub status: ExportStatus,
    /// Wall-clock time spent on this table
    pub duration_ms: u64,
}

impl TableExport {
    /// Records a table that failed before any rows were read.
    pub fn failed(
        source: impl Into<PathBuf>,
        table: impl Into<String>,
        output: impl Into<PathBuf>,
        error: impl std::fmt::Display,
    ) -> Self {
        Self {
            source: source.into(),
            table: table.into(),
            output: output.into(),
            status: ExportStatus::Failed {
                error: error.to_string(),
            },
            duration_ms: 0,
        }
    }

    /// Returns true if a CSV file was produced.
    pub fn is_exported(&self) -> bool {
        matches!(self.status, ExportStatus::Exported { .. })
    }

    /// Returns true if the export failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.status, ExportStatus::Failed { .. })
    }
}

/// Aggregate counts for a finished conversion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Tables or sheets attempted
    pub total: usize,
    /// Exports that produced a CSV file
    pub exported: usize,
    /// Empty tables dropped by `--skip-empty`
    pub skipped: usize,
    /// Exports that failed
    pub failed: usize,
    /// Data rows written across all files
    pub rows: u64,
}

/// Result of one conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Input path given by the user (file or directory)
    pub source: PathBuf,
    /// Kind of source being converted
    pub source_kind: SourceKind,
    /// Backend that read the source, when one was selected
    pub backend: Option<BackendKind>,
    /// Directory the CSV files were written to
    pub output_dir: PathBuf,
    /// When the run started
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// Total run time
    pub duration_ms: u64,
    /// Per-table outcomes in export order
    pub exports: Vec<TableExport>,
    /// Counts computed by `finish`
    pub summary: ReportSummary,
    /// Version of the tool that wrote the report
    pub tool_version: String,

    #[serde(skip)]
    timer: Option<Instant>,
}

impl ConversionReport {
    /// Starts a new report; the clock runs until `finish` is called.
    pub fn start(
        source: impl Into<PathBuf>,
        source_kind: SourceKind,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source: source.into(),
            source_kind,
            backend: None,
            output_dir: output_dir.into(),
            started_at: chrono::Utc::now(),
            duration_ms: 0,
            exports: Vec::new(),
            summary: ReportSummary::default(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            timer: Some(Instant::now()),
        }
    }

    /// Records which backend is reading the source.
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Appends one export result.
    pub fn push(&mut self, export: TableExport) {
        self.exports.push(export);
    }

    /// Stops the clock and computes the summary counts.
    pub fn finish(&mut self) {
        if let Some(timer) = self.timer.take() {
            self.duration_ms = elapsed_ms(timer);
        }

        let mut summary = ReportSummary {
            total: self.exports.len(),
            ..ReportSummary::default()
        };
        for export in &self.exports {
            match &export.status {
                ExportStatus::Exported { rows } => {
                    summary.exported = summary.exported.saturating_add(1);
                    summary.rows = summary.rows.saturating_add(*rows);
                }
                ExportStatus::SkippedEmpty => {
                    summary.skipped = summary.skipped.saturating_add(1);
                }
                ExportStatus::Failed { .. } => {
                    summary.failed = summary.failed.saturating_add(1);
                }
            }
        }
        self.summary = summary;
    }

    /// Failed exports in source order.
    pub fn failures(&self) -> impl Iterator<Item = &TableExport> {
        self.exports.iter().filter(|e| e.is_failed())
    }
}

/// Milliseconds since `start`, saturating at `u64::MAX`.
pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
