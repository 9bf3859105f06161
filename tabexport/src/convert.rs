//! Conversion workflows behind the `excel`, `access`, `tables` and
//! `backends` subcommands.
//!
//! Each workflow resolves its paths, picks a backend, enumerates tables and
//! exports them one at a time. Setup problems (missing input, no backend,
//! unknown table name) return an error; a table that fails to export is
//! recorded in the report and the loop moves on.

use std::path::{Path, PathBuf};
use tabexport_core::{
    BackendAvailability, BackendFeature, BackendKind, ConversionReport, ExportConfig, OdbcConfig,
    OutputNames, Result, SourceBackend, SourceKind, TabExportError, TableExport, TableFilter,
    backend_availability, backends::spreadsheet::SpreadsheetBackend, ensure_output_dir,
    export_one, models::WORKBOOK_EXTENSIONS, select_backend, sheet_output_path,
    table_output_path,
};
use tracing::{debug, info, warn};

use crate::output::{Reporter, format_status, format_table_status, save_report};
use crate::prompt;
use crate::{AccessArgs, Cli, Command, ExcelArgs, TablesArgs};

/// Runs the selected subcommand.
///
/// # Errors
/// Returns setup errors, report write errors, and `ExportsFailed` when
/// `--strict` is set and any export failed.
pub async fn run(cli: &Cli) -> Result<()> {
    let reporter = Reporter::new(cli.global.quiet);

    let report = match &cli.command {
        Command::Excel(args) => convert_workbooks(args, reporter).await?,
        Command::Access(args) => export_access(args, reporter).await?,
        Command::Tables(args) => {
            for name in source_tables(args).await? {
                println!("{}", name);
            }
            return Ok(());
        }
        Command::Backends(args) => {
            for availability in backend_availability(&args.mdbtools.backend_config()).await {
                println!("{}", format_availability(&availability));
            }
            return Ok(());
        }
    };

    if let Some(path) = &cli.global.report {
        save_report(&report, path).await?;
    }
    check_strict(&report, cli.global.strict)
}

/// Fails with `ExportsFailed` when strict and any export failed.
pub fn check_strict(report: &ConversionReport, strict: bool) -> Result<()> {
    let failed = report.summary.failed;
    if strict && failed > 0 {
        return Err(TabExportError::ExportsFailed {
            failed,
            total: report.summary.total,
        });
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Excel
// ============================================================================

/// Returns true for a workbook file, skipping Office lock files (`~$Book.xlsx`).
fn is_workbook_file(path: &Path) -> bool {
    let is_lock_file = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("~$"));
    !is_lock_file && SourceKind::from_path(path) == Some(SourceKind::Workbook)
}

/// Workbooks directly inside `dir` (not recursive), sorted by name.
///
/// # Errors
/// Returns an I/O error if the directory cannot be read.
pub async fn discover_workbooks(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_error =
        |e| TabExportError::io(format!("Failed to read directory {}", dir.display()), e);

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_error)?;
    let mut workbooks = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let path = entry.path();
        if !is_workbook_file(&path) {
            continue;
        }
        // Follows symlinks, so a linked workbook counts as a file
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => workbooks.push(path),
            Ok(_) => {}
            Err(e) => debug!("Skipping {}: {}", path.display(), e),
        }
    }

    workbooks.sort();
    debug!(
        "Found {} workbooks ({}) in {}",
        workbooks.len(),
        WORKBOOK_EXTENSIONS.join(", "),
        dir.display()
    );
    Ok(workbooks)
}

/// Converts workbooks to CSV: the first sheet of each, or every sheet with
/// `--all-sheets`.
///
/// # Errors
/// Returns an error if the source is missing or is not a workbook, or the
/// output directory cannot be created.
pub async fn convert_workbooks(args: &ExcelArgs, reporter: Reporter) -> Result<ConversionReport> {
    let source = match &args.source {
        Some(source) => source.clone(),
        None => prompt::prompt_path("Enter source directory")?,
    };

    let (source_dir, workbooks) = if source.is_dir() {
        let workbooks = discover_workbooks(&source).await?;
        (source.clone(), workbooks)
    } else if source.is_file() {
        if !is_workbook_file(&source) {
            return Err(TabExportError::configuration(format!(
                "not an Excel workbook: {} (expected .{})",
                source.display(),
                WORKBOOK_EXTENSIONS.join(", .")
            )));
        }
        let parent = source.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        (parent, vec![source.clone()])
    } else {
        return Err(TabExportError::configuration(format!(
            "Source not found: {}",
            source.display()
        )));
    };

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| source_dir.join("csv"));
    let config = ExportConfig::new()
        .with_skip_empty(args.selection.skip_empty)
        .with_all_sheets(args.all_sheets)
        .with_filter(args.selection.filter(false));
    config.validate()?;

    let mut report = ConversionReport::start(&source, SourceKind::Workbook, &output_dir)
        .with_backend(BackendKind::Spreadsheet);

    if workbooks.is_empty() {
        reporter.line(format!("No Excel files found in {}", source.display()));
        report.finish();
        return Ok(report);
    }

    ensure_output_dir(&output_dir).await?;
    reporter.line(format!("Found {} Excel files", workbooks.len()));
    reporter.line(format!("Output directory: {}", output_dir.display()));
    reporter.blank();

    let mut target = Target {
        output_dir: &output_dir,
        names: OutputNames::new(),
        report: &mut report,
    };
    for workbook in &workbooks {
        let backend = SpreadsheetBackend::new(workbook);
        if config.all_sheets {
            convert_all_sheets(&backend, workbook, &config, reporter, &mut target).await;
        } else {
            convert_first_sheet(&backend, workbook, &config, reporter, &mut target).await;
        }
    }

    report.finish();
    let unit = if config.all_sheets { "sheets" } else { "files" };
    reporter.blank();
    reporter.line(format!(
        "✅ Converted {} / {} {}",
        report.summary.exported, report.summary.total, unit
    ));
    reporter.line(format!("CSV files saved to: {}", output_dir.display()));
    info!(
        "Workbook conversion finished in {} ms ({} rows)",
        report.duration_ms, report.summary.rows
    );

    Ok(report)
}

/// Sheet names of one workbook after filtering.
async fn selected_sheets(
    backend: &SpreadsheetBackend,
    filter: &TableFilter,
) -> Result<Vec<String>> {
    filter.apply(backend.list_tables().await?)
}

/// Where one workbook run writes: the directory, the file names already
/// used and the report collecting each outcome.
struct Target<'a> {
    output_dir: &'a Path,
    names: OutputNames,
    report: &'a mut ConversionReport,
}

async fn convert_first_sheet(
    backend: &SpreadsheetBackend,
    workbook: &Path,
    config: &ExportConfig,
    reporter: Reporter,
    target: &mut Target<'_>,
) {
    let sheets = selected_sheets(backend, &config.filter).await;
    if matches!(&sheets, Ok(sheets) if sheets.is_empty()) {
        reporter.line(format!("Converting: {}", file_name(workbook)));
        reporter.line("  ⚠️  No sheet matches the selection");
        return;
    }

    let destination = target
        .names
        .claim(sheet_output_path(target.output_dir, workbook, None));
    reporter.line(format!(
        "Converting: {} → {}",
        file_name(workbook),
        file_name(&destination)
    ));

    let export = match sheets {
        Ok(sheets) => match sheets.first() {
            Some(sheet) => export_one(backend, workbook, sheet, destination, config).await,
            None => return,
        },
        Err(e) => {
            warn!("Cannot read {}: {}", workbook.display(), e);
            TableExport::failed(workbook, file_name(workbook), destination, e)
        }
    };

    reporter.export_result(&export, format_status(&export.status, "Sheet"));
    target.report.push(export);
}

async fn convert_all_sheets(
    backend: &SpreadsheetBackend,
    workbook: &Path,
    config: &ExportConfig,
    reporter: Reporter,
    target: &mut Target<'_>,
) {
    reporter.line(format!("Converting: {}", file_name(workbook)));

    let sheets = match selected_sheets(backend, &config.filter).await {
        Ok(sheets) => sheets,
        Err(e) => {
            warn!("Cannot read {}: {}", workbook.display(), e);
            let destination = sheet_output_path(target.output_dir, workbook, None);
            let export = TableExport::failed(workbook, file_name(workbook), destination, e);
            reporter.export_result(&export, format_status(&export.status, "Sheet"));
            target.report.push(export);
            return;
        }
    };

    for sheet in &sheets {
        let destination = target
            .names
            .claim(sheet_output_path(target.output_dir, workbook, Some(sheet)));
        reporter.line(format!("  {} → {}", sheet, file_name(&destination)));
        let export = export_one(backend, workbook, sheet, destination, config).await;
        reporter.export_result(&export, format!("  {}", format_status(&export.status, "Sheet")));
        target.report.push(export);
    }
}

// ============================================================================
// Access
// ============================================================================

/// Resolves the database path and checks that it is an Access file.
fn check_database(database: &Path) -> Result<()> {
    if !database.is_file() {
        return Err(TabExportError::configuration(format!(
            "Access database not found: {}",
            database.display()
        )));
    }
    if SourceKind::from_path(database) != Some(SourceKind::AccessDatabase) {
        return Err(TabExportError::configuration(format!(
            "not an Access database: {} (expected .accdb or .mdb)",
            database.display()
        )));
    }
    Ok(())
}

/// Adds a prompted password to the ODBC settings when requested.
fn odbc_config(password_prompt: bool) -> Result<OdbcConfig> {
    let config = OdbcConfig::new();
    if !password_prompt {
        return Ok(config);
    }
    Ok(match prompt::prompt_password()? {
        Some(password) => config.with_password(password),
        None => config,
    })
}

/// Exports every non-system table of an Access database.
///
/// # Errors
/// Returns an error if the database is missing, no backend can read it, the
/// table list cannot be read, or a `--table` name does not exist.
pub async fn export_access(args: &AccessArgs, reporter: Reporter) -> Result<ConversionReport> {
    let database = match &args.database {
        Some(database) => database.clone(),
        None => prompt::prompt_path("Enter path to Access database (.accdb)")?,
    };
    check_database(&database)?;

    let output_dir = args.output.clone().unwrap_or_else(|| {
        database
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join("access_export")
    });
    let config = ExportConfig::new()
        .with_skip_empty(args.selection.skip_empty)
        .with_filter(args.selection.filter(true));
    config.validate()?;

    let backend_config = args
        .mdbtools
        .backend_config()
        .with_odbc(odbc_config(args.password_prompt)?);
    backend_config.validate()?;

    reporter.line(format!("Reading Access database: {}", database.display()));
    reporter.line(format!("Output directory: {}", output_dir.display()));
    reporter.blank();

    let backend = select_backend(&database, args.backend, &backend_config).await?;
    reporter.line(format!("✅ Using {}", backend.backend_kind()));
    if args.password_prompt && !backend.supports_feature(BackendFeature::PasswordProtected) {
        warn!(
            "The {} backend cannot use a database password; it is ignored",
            backend.backend_kind()
        );
    }

    let tables = config.filter.apply(backend.list_tables().await?)?;
    reporter.line(format!(
        "Found {} tables: {}",
        tables.len(),
        tables.join(", ")
    ));

    ensure_output_dir(&output_dir).await?;
    let mut report = ConversionReport::start(&database, SourceKind::AccessDatabase, &output_dir)
        .with_backend(backend.backend_kind());

    let mut names = OutputNames::new();
    for table in &tables {
        let destination = names.claim(table_output_path(&output_dir, table));
        reporter.blank();
        reporter.line(format!("Exporting: {} → {}", table, destination.display()));
        let export = export_one(backend.as_ref(), &database, table, destination, &config).await;
        reporter.export_result(&export, format_table_status(&export.status));
        report.push(export);
    }

    report.finish();
    reporter.blank();
    reporter.line("=== Export Complete ===");
    reporter.line(format!(
        "Exported {} / {} tables",
        report.summary.exported, report.summary.total
    ));
    reporter.line(format!("CSV files saved to: {}", output_dir.display()));
    info!(
        "Access export finished in {} ms ({} rows)",
        report.duration_ms, report.summary.rows
    );

    Ok(report)
}

// ============================================================================
// Inspection
// ============================================================================

/// Table or sheet names of a source, Access system tables hidden unless
/// `--include-system` is given.
///
/// # Errors
/// Returns an error if no backend can read the source.
pub async fn source_tables(args: &TablesArgs) -> Result<Vec<String>> {
    let backend_config = args
        .mdbtools
        .backend_config()
        .with_odbc(odbc_config(args.password_prompt)?);

    let backend = select_backend(&args.source, args.backend, &backend_config).await?;
    let is_access = SourceKind::from_path(&args.source) == Some(SourceKind::AccessDatabase);

    TableFilter::new()
        .with_skip_system(is_access && !args.include_system)
        .apply(backend.list_tables().await?)
}

/// One line of the `backends` listing.
pub fn format_availability(availability: &BackendAvailability) -> String {
    let status = match availability.available {
        Some(true) => "available",
        Some(false) => "missing",
        None => "not compiled",
    };
    format!(
        "{:<12} {:<13} {}",
        availability.backend.to_string(),
        status,
        availability.detail
    )
}
