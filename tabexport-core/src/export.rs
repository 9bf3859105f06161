//! CSV writing, output file naming and the per-table export step.

use crate::{
    Result,
    backends::{ExportConfig, SourceBackend},
    error::TabExportError,
    models::{ExportStatus, TableExport, elapsed_ms},
};
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// Characters that cannot appear in file names on common file systems.
const ILLEGAL_FILE_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Replaces characters that are illegal in file names with `_`.
///
/// Control characters are replaced too, and an empty or dot-only result
/// becomes `_` so the output never escapes the target directory.
///
/// ```rust
/// use tabexport_core::export::sanitize_file_stem;
///
/// assert_eq!(sanitize_file_stem("Q1/Q2 Costs"), "Q1_Q2 Costs");
/// assert_eq!(sanitize_file_stem(".."), "_");
/// ```
pub fn sanitize_file_stem(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if ILLEGAL_FILE_NAME_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = cleaned.trim();

    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Output path for an Access table: `<out>/<table>.csv`.
pub fn table_output_path(output_dir: &Path, table: &str) -> PathBuf {
    output_dir.join(format!("{}.csv", sanitize_file_stem(table)))
}

/// Output path for a workbook sheet.
///
/// `sheet = None` names the file after the workbook alone (`<out>/W.csv`);
/// `Some(sheet)` gives `<out>/W_<sheet>.csv`.
pub fn sheet_output_path(output_dir: &Path, workbook: &Path, sheet: Option<&str>) -> PathBuf {
    let stem = workbook
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workbook".to_string());

    let name = match sheet {
        Some(sheet) => format!("{}_{}", stem, sheet),
        None => stem,
    };
    output_dir.join(format!("{}.csv", sanitize_file_stem(&name)))
}

/// Output paths handed out during one run.
///
/// Distinct names can sanitize to the same file (`Q1|Q2` and `Q1_Q2`, or
/// `Fleet.xlsx` and `Fleet.xls`), and common file systems fold case. A path
/// already claimed gets a numeric suffix (`Fleet_Q1_Q2_2.csv`) so no export
/// overwrites another.
#[derive(Debug, Default)]
pub struct OutputNames {
    used: HashSet<String>,
}

impl OutputNames {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `path`, or the first free `<stem>_<n>.<ext>` next to it.
    pub fn claim(&mut self, path: PathBuf) -> PathBuf {
        if self.used.insert(Self::key(&path)) {
            return path;
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned());

        let mut suffix: u32 = 2;
        loop {
            let name = match &extension {
                Some(extension) => format!("{}_{}.{}", stem, suffix, extension),
                None => format!("{}_{}", stem, suffix),
            };
            let candidate = path.with_file_name(name);
            if self.used.insert(Self::key(&candidate)) {
                warn!(
                    "{} is already used in this run; writing {} instead",
                    path.display(),
                    candidate.display()
                );
                return candidate;
            }
            suffix = suffix.saturating_add(1);
        }
    }

    fn key(path: &Path) -> String {
        path.to_string_lossy().to_lowercase()
    }
}

/// Opens a CSV writer on `path` with the tool's fixed dialect.
///
/// Comma delimiter, `"` quoting only where needed, `\n` terminator.
pub fn create_csv_writer(path: &Path) -> Result<csv::Writer<File>> {
    csv::WriterBuilder::new()
        .delimiter(b',')
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .flexible(true)
        .from_path(path)
        .map_err(|e| TabExportError::csv(format!("Failed to create {}", path.display()), e))
}

/// Counts data records in a CSV file, excluding the header row.
///
/// Quoted fields with embedded newlines count as one record.
pub fn count_csv_records(path: &Path) -> Result<u64> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| TabExportError::csv(format!("Failed to open {}", path.display()), e))?;

    let mut count: u64 = 0;
    let mut record = csv::ByteRecord::new();
    while reader
        .read_byte_record(&mut record)
        .map_err(|e| TabExportError::csv(format!("Failed to read {}", path.display()), e))?
    {
        count = count.saturating_add(1);
    }
    Ok(count)
}

/// Creates the output directory (and parents) if missing.
pub async fn ensure_output_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path).await.map_err(|e| {
        TabExportError::io(
            format!("Failed to create output directory {}", path.display()),
            e,
        )
    })
}

/// Exports one table through `backend` and records the outcome.
///
/// Errors never propagate: a failed table becomes `ExportStatus::Failed` so
/// the caller can continue with the next one. With `skip_empty`, a table
/// with no data rows has its file removed and is reported as skipped.
pub async fn export_one(
    backend: &dyn SourceBackend,
    source: &Path,
    table: &str,
    destination: PathBuf,
    config: &ExportConfig,
) -> TableExport {
    let started = Instant::now();
    debug!(
        "Exporting '{}' via {} to {}",
        table,
        backend.backend_kind(),
        destination.display()
    );

    let status = match backend.export_table(table, &destination).await {
        Ok(0) if config.skip_empty => {
            if let Err(e) = tokio::fs::remove_file(&destination).await {
                warn!(
                    "Could not remove empty export {}: {}",
                    destination.display(),
                    e
                );
            }
            ExportStatus::SkippedEmpty
        }
        Ok(rows) => ExportStatus::Exported { rows },
        Err(e) => {
            warn!("Export of '{}' failed: {}", table, e);
            ExportStatus::Failed {
                error: e.to_string(),
            }
        }
    };

    TableExport {
        source: source.to_path_buf(),
        table: table.to_string(),
        output: destination,
        status,
        duration_ms: elapsed_ms(started),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("Assets"), "Assets");
        assert_eq!(sanitize_file_stem("Vehicle List 2024"), "Vehicle List 2024");
        assert_eq!(sanitize_file_stem("a/b\\c:d*e?f\"g<h>i|j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_file_stem("tab\tname"), "tab_name");
        assert_eq!(sanitize_file_stem("   "), "_");
        assert_eq!(sanitize_file_stem("."), "_");
        assert_eq!(sanitize_file_stem("Übersicht"), "Übersicht");
    }

    #[test]
    fn test_output_paths() {
        let out = Path::new("/tmp/out");
        assert_eq!(
            table_output_path(out, "Asset Register"),
            PathBuf::from("/tmp/out/Asset Register.csv")
        );
        assert_eq!(
            sheet_output_path(out, Path::new("/data/Fleet.xlsx"), None),
            PathBuf::from("/tmp/out/Fleet.csv")
        );
        assert_eq!(
            sheet_output_path(out, Path::new("/data/Fleet.xlsx"), Some("Q1/Q2")),
            PathBuf::from("/tmp/out/Fleet_Q1_Q2.csv")
        );
    }

    #[test]
    fn test_output_names_suffix_clashing_paths() {
        let out = Path::new("/tmp/out");
        let workbook = Path::new("/data/Fleet.xlsx");
        let mut names = OutputNames::new();

        assert_eq!(
            names.claim(sheet_output_path(out, workbook, Some("Q1|Q2"))),
            PathBuf::from("/tmp/out/Fleet_Q1_Q2.csv")
        );
        assert_eq!(
            names.claim(sheet_output_path(out, workbook, Some("Q1_Q2"))),
            PathBuf::from("/tmp/out/Fleet_Q1_Q2_2.csv")
        );
        // Case-insensitive clash
        assert_eq!(
            names.claim(sheet_output_path(out, workbook, Some("q1_q2"))),
            PathBuf::from("/tmp/out/Fleet_q1_q2_3.csv")
        );

        assert_eq!(
            names.claim(table_output_path(out, "A/B")),
            PathBuf::from("/tmp/out/A_B.csv")
        );
        assert_eq!(
            names.claim(table_output_path(out, "A_B")),
            PathBuf::from("/tmp/out/A_B_2.csv")
        );
        assert_eq!(
            names.claim(table_output_path(out, "Sites")),
            PathBuf::from("/tmp/out/Sites.csv")
        );
    }

    #[test]
    fn test_output_names_skip_taken_suffix() {
        let out = Path::new("/tmp/out");
        let mut names = OutputNames::new();
        names.claim(table_output_path(out, "A_B_2"));
        names.claim(table_output_path(out, "A_B"));
        assert_eq!(
            names.claim(table_output_path(out, "A/B")),
            PathBuf::from("/tmp/out/A_B_3.csv")
        );
    }

    #[test]
    fn test_csv_writer_quotes_only_when_needed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut writer = create_csv_writer(&path).unwrap();
        writer.write_record(["id", "name", "notes"]).unwrap();
        writer
            .write_record(["1", "Desk, oak", "said \"hi\"\nthen left"])
            .unwrap();
        writer.flush().unwrap();
        drop(writer);

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "id,name,notes\n1,\"Desk, oak\",\"said \"\"hi\"\"\nthen left\"\n"
        );
    }

    #[test]
    fn test_count_csv_records_handles_embedded_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        let mut file = File::create(&path).unwrap();
        write!(file, "id,comment\n1,\"line one\nline two\"\n2,plain\n").unwrap();
        drop(file);

        assert_eq!(count_csv_records(&path).unwrap(), 2);
    }

    #[test]
    fn test_count_csv_records_header_only_and_empty() {
        let dir = tempfile::tempdir().unwrap();

        let header_only = dir.path().join("header.csv");
        std::fs::write(&header_only, "id,name\n").unwrap();
        assert_eq!(count_csv_records(&header_only).unwrap(), 0);

        let empty = dir.path().join("empty.csv");
        std::fs::write(&empty, "").unwrap();
        assert_eq!(count_csv_records(&empty).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ensure_output_dir_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_output_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        // Idempotent
        ensure_output_dir(&nested).await.unwrap();
    }
}
