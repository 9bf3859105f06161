//! Core library for tabexport: reading tabular sources and writing CSV.
//!
//! This crate provides the backends, table selection and CSV output shared
//! by the `tabexport` binary. A source is either an Excel workbook or a
//! Microsoft Access database; each table or sheet becomes one CSV file.
//!
//! # Guarantees
//! - Sources are only ever opened for reading
//! - Column order in every CSV matches the source
//! - Database passwords are zeroed on drop and never logged
//!
//! # Architecture
//! - `SourceBackend` trait with one implementation per reading method
//! - `select_backend` probes candidates in order, first success wins
//! - `export_one` turns per-table failures into report entries so a run
//!   continues past a bad table

pub mod backends;
pub mod error;
pub mod export;
pub mod filter;
pub mod logging;
pub mod models;
pub mod security;

// Re-export commonly used types
pub use backends::{
    BackendAvailability, BackendConfig, BackendFeature, BackendPreference, ExportConfig,
    MdbToolsConfig, OdbcConfig, SourceBackend, backend_availability, create_backend,
    select_backend,
};
pub use error::{BackendAttempt, Result, TabExportError};
pub use export::{
    OutputNames, ensure_output_dir, export_one, sheet_output_path, table_output_path,
};
pub use filter::TableFilter;
pub use logging::init_logging;
pub use models::{
    BackendKind, ConversionReport, ExportStatus, ReportSummary, SourceKind, TableExport,
};
pub use security::DatabasePassword;
