//! Spreadsheet backend built on calamine.
//!
//! # Module Structure
//! - `cell`: cell-to-text rendering rules
//!
//! One code path serves `.xlsx`, `.xlsm`, `.xlsb` and `.xls` through
//! `open_workbook_auto`. calamine is synchronous, so every operation runs on
//! tokio's blocking pool and reopens the workbook; nothing is held between
//! calls.

pub mod cell;

use super::{BackendFeature, SourceBackend};
use crate::{Result, error::TabExportError, export::create_csv_writer, models::BackendKind};
use async_trait::async_trait;
use calamine::{Reader, open_workbook_auto};
use std::path::{Path, PathBuf};

pub use cell::render_cell;

/// Reads sheets from an Excel workbook.
#[derive(Debug, Clone)]
pub struct SpreadsheetBackend {
    path: PathBuf,
}

impl SpreadsheetBackend {
    /// Creates a backend for the workbook at `path` (not opened yet).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Workbook path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sheet names in workbook order (blocking).
    pub fn sheet_names_blocking(path: &Path) -> Result<Vec<String>> {
        let workbook = open_workbook_auto(path).map_err(|e| {
            TabExportError::source_open(format!("cannot open workbook {}", path.display()), e)
        })?;
        Ok(workbook.sheet_names())
    }

    /// Writes one sheet to `destination` (blocking).
    ///
    /// The first row of the used range is the header; returns the number of
    /// rows after it. An empty sheet yields an empty file and 0.
    pub fn export_sheet_blocking(path: &Path, sheet: &str, destination: &Path) -> Result<u64> {
        let mut workbook = open_workbook_auto(path).map_err(|e| {
            TabExportError::source_open(format!("cannot open workbook {}", path.display()), e)
        })?;

        let range = workbook
            .worksheet_range(sheet)
            .map_err(|e| TabExportError::table_read(sheet, "cannot read sheet range", e))?;

        let mut writer = create_csv_writer(destination)?;
        let mut written: u64 = 0;
        for row in range.rows() {
            let record: Vec<String> = row.iter().map(render_cell).collect();
            writer.write_record(&record).map_err(|e| {
                TabExportError::csv(format!("Failed to write {}", destination.display()), e)
            })?;
            written = written.saturating_add(1);
        }
        writer.flush().map_err(|e| {
            TabExportError::io(format!("Failed to flush {}", destination.display()), e)
        })?;

        // Header row does not count
        Ok(written.saturating_sub(1))
    }
}

async fn run_blocking<T, F>(context: &str, task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| TabExportError::source_open(context.to_string(), e))?
}

#[async_trait]
impl SourceBackend for SpreadsheetBackend {
    async fn probe(&self) -> Result<()> {
        let path = self.path.clone();
        run_blocking("workbook probe task failed", move || {
            Self::sheet_names_blocking(&path).map(|_| ())
        })
        .await
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let path = self.path.clone();
        run_blocking("sheet listing task failed", move || {
            Self::sheet_names_blocking(&path)
        })
        .await
    }

    async fn export_table(&self, table: &str, destination: &Path) -> Result<u64> {
        let path = self.path.clone();
        let sheet = table.to_string();
        let destination = destination.to_path_buf();
        run_blocking("sheet export task failed", move || {
            Self::export_sheet_blocking(&path, &sheet, &destination)
        })
        .await
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Spreadsheet
    }

    fn supports_feature(&self, feature: BackendFeature) -> bool {
        matches!(feature, BackendFeature::TableEnumeration)
        // Headers come from the first row, and calamine cannot open
        // password-protected workbooks.
    }
}
