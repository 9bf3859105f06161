//! Library module for the tabexport binary.
//!
//! Argument types and the conversion workflows live here so integration
//! tests can drive them without spawning the binary; `main.rs` only parses
//! arguments, sets up logging and maps errors to an exit status.

pub mod convert;
pub mod output;
pub mod prompt;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tabexport_core::{BackendConfig, BackendPreference, MdbToolsConfig, TableFilter};

/// CLI argument structure
#[derive(Debug, Parser)]
#[command(name = "tabexport")]
#[command(about = "Convert Excel workbooks and Access databases to CSV")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "
tabexport - Convert Excel workbooks and Access databases to CSV

Every sheet or table becomes one CSV file with its column order preserved.
Sources are only ever read.

BACKENDS:
- Excel (.xlsx, .xlsm, .xls, .xlsb): built in
- Access (.accdb, .mdb): mdbtools (mdb-tables / mdb-export on PATH)
- Access via ODBC: Microsoft Access Database Engine [if compiled with --features odbc]

EXAMPLES:
  tabexport excel ~/exports
  tabexport excel Fleet.xlsx --all-sheets -o out/
  tabexport access inventory.accdb --skip-empty
  tabexport access legacy.mdb --table Assets --report report.json
  tabexport backends
")]
pub struct Cli {
    /// Flags accepted by every subcommand
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert Excel workbooks to CSV
    Excel(ExcelArgs),
    /// Export every table of an Access database to CSV
    Access(AccessArgs),
    /// List the tables or sheets of a source without exporting
    Tables(TablesArgs),
    /// Show which backends are usable on this machine
    Backends(BackendsArgs),
}

/// Verbosity, report and strict-mode flags.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(
        short,
        long,
        global = true,
        help = "Suppress progress output except errors"
    )]
    pub quiet: bool,

    /// Write a JSON conversion report
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        help = "Write a JSON report of the run to FILE"
    )]
    pub report: Option<PathBuf>,

    /// Fail when any table fails
    #[arg(
        long,
        global = true,
        help = "Exit with status 1 if any table or sheet fails to export"
    )]
    pub strict: bool,
}

/// Table selection flags shared by `excel` and `access`.
#[derive(Debug, Clone, Default, Args)]
pub struct SelectionArgs {
    /// Only export these tables or sheets
    #[arg(
        long = "table",
        value_name = "NAME",
        value_delimiter = ',',
        help = "Only export the named tables/sheets (repeatable or comma-separated)"
    )]
    pub tables: Vec<String>,

    /// Skip tables matching these patterns
    #[arg(
        long,
        value_name = "GLOB",
        value_delimiter = ',',
        help = "Skip tables/sheets matching a glob pattern (*, ?)"
    )]
    pub exclude: Vec<String>,

    /// Drop empty tables
    #[arg(long, help = "Do not keep CSV files for tables without data rows")]
    pub skip_empty: bool,
}

impl SelectionArgs {
    /// Builds the table filter; `skip_system` is set for Access sources.
    pub fn filter(&self, skip_system: bool) -> TableFilter {
        TableFilter::new()
            .with_skip_system(skip_system)
            .with_include(self.tables.clone())
            .with_exclude(self.exclude.clone())
    }
}

/// mdbtools executable overrides.
#[derive(Debug, Clone, Args)]
pub struct MdbToolsArgs {
    /// Table listing program
    #[arg(
        long,
        env = "TABEXPORT_MDB_TABLES",
        default_value = "mdb-tables",
        value_name = "PROGRAM",
        help = "mdbtools table listing program"
    )]
    pub mdb_tables: PathBuf,

    /// Table export program
    #[arg(
        long,
        env = "TABEXPORT_MDB_EXPORT",
        default_value = "mdb-export",
        value_name = "PROGRAM",
        help = "mdbtools table export program"
    )]
    pub mdb_export: PathBuf,
}

impl MdbToolsArgs {
    /// mdbtools settings with the configured program paths.
    pub fn to_config(&self) -> MdbToolsConfig {
        MdbToolsConfig::new()
            .with_tables_program(&self.mdb_tables)
            .with_export_program(&self.mdb_export)
    }

    /// Backend settings carrying these mdbtools programs.
    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig::new().with_mdbtools(self.to_config())
    }
}

/// Arguments for `excel`.
#[derive(Debug, Args)]
pub struct ExcelArgs {
    /// Directory of workbooks, or one workbook
    #[arg(help = "Directory containing workbooks, or a single workbook (prompted if omitted)")]
    pub source: Option<PathBuf>,

    /// Output directory
    #[arg(
        short,
        long,
        env = "TABEXPORT_OUTPUT_DIR",
        value_name = "DIR",
        help = "Output directory (default: <source dir>/csv)"
    )]
    pub output: Option<PathBuf>,

    /// Export every sheet
    #[arg(long, help = "Export every sheet as <workbook>_<sheet>.csv")]
    pub all_sheets: bool,

    /// Sheet selection
    #[command(flatten)]
    pub selection: SelectionArgs,
}

/// Arguments for `access`.
#[derive(Debug, Args)]
pub struct AccessArgs {
    /// Access database file
    #[arg(help = "Access database (.accdb or .mdb; prompted if omitted)")]
    pub database: Option<PathBuf>,

    /// Output directory
    #[arg(
        short,
        long,
        env = "TABEXPORT_OUTPUT_DIR",
        value_name = "DIR",
        help = "Output directory (default: <database dir>/access_export)"
    )]
    pub output: Option<PathBuf>,

    /// Backend selection
    #[arg(
        long,
        env = "TABEXPORT_BACKEND",
        default_value = "auto",
        value_name = "BACKEND",
        help = "Backend to use: auto, mdbtools or odbc"
    )]
    pub backend: BackendPreference,

    /// Prompt for a database password
    #[arg(long, help = "Prompt for the database password (ODBC only)")]
    pub password_prompt: bool,

    /// Table selection
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// mdbtools program overrides
    #[command(flatten)]
    pub mdbtools: MdbToolsArgs,
}

/// Arguments for `tables`.
#[derive(Debug, Args)]
pub struct TablesArgs {
    /// Workbook or Access database
    #[arg(help = "Workbook or Access database to inspect")]
    pub source: PathBuf,

    /// Backend selection
    #[arg(
        long,
        env = "TABEXPORT_BACKEND",
        default_value = "auto",
        value_name = "BACKEND",
        help = "Backend to use for Access databases: auto, mdbtools or odbc"
    )]
    pub backend: BackendPreference,

    /// Show Access system tables
    #[arg(long, help = "Include Access system tables (MSys*, ~*)")]
    pub include_system: bool,

    /// Prompt for a database password
    #[arg(long, help = "Prompt for the database password (ODBC only)")]
    pub password_prompt: bool,

    /// mdbtools program overrides
    #[command(flatten)]
    pub mdbtools: MdbToolsArgs,
}

/// Arguments for `backends`.
#[derive(Debug, Args)]
pub struct BackendsArgs {
    /// mdbtools programs to check
    #[command(flatten)]
    pub mdbtools: MdbToolsArgs,
}
