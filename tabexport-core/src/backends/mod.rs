//! Source backend trait, factory and probing.
//!
//! Every way of reading tabular data (spreadsheet reader, mdbtools, ODBC)
//! implements `SourceBackend`. Access databases may be readable through more
//! than one backend, so `select_backend` walks an ordered candidate list and
//! keeps the first backend whose probe succeeds.
//!
//! # Module Structure
//! - `config`: Configuration types (ExportConfig, BackendConfig, ...)
//! - `spreadsheet`: calamine-based workbook reader
//! - `mdbtools`: `mdb-tables` / `mdb-export` command-line tools
//! - `odbc`: Microsoft Access ODBC driver (feature `odbc`)

use crate::{
    Result,
    error::{BackendAttempt, TabExportError},
    models::{BackendKind, SourceKind},
};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

pub mod config;
pub mod mdbtools;
#[cfg(feature = "odbc")]
pub mod odbc;
pub mod spreadsheet;

pub use config::{
    ACCESS_ODBC_DRIVERS, BackendConfig, BackendPreference, ExportConfig, MdbToolsConfig,
    OdbcConfig,
};

/// Features that backends may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFeature {
    /// Listing tables or sheets without reading rows
    TableEnumeration,
    /// Opening password-protected databases
    PasswordProtected,
    /// Header taken from the table definition rather than the first data row
    HeaderFromSchema,
}

/// Main trait for source backends with object-safe design.
///
/// # Object Safety
/// This trait is object-safe, allowing dynamic dispatch through
/// `Box<dyn SourceBackend>`.
#[async_trait]
pub trait SourceBackend: Send + Sync {
    /// Checks that this backend can read the source.
    ///
    /// # Errors
    /// Returns `BackendUnavailable` if the driver or tool is missing, or a
    /// source error if the file cannot be opened.
    async fn probe(&self) -> Result<()>;

    /// Lists table or sheet names in source order.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Writes every row of `table` to `destination` as CSV, header first.
    ///
    /// # Returns
    /// The number of data rows written, header excluded.
    async fn export_table(&self, table: &str, destination: &Path) -> Result<u64>;

    /// Returns the backend kind.
    fn backend_kind(&self) -> BackendKind;

    /// Checks if the backend supports a specific feature.
    fn supports_feature(&self, feature: BackendFeature) -> bool;
}

/// Creates one backend for `source` without probing it.
///
/// # Errors
/// Returns `BackendUnavailable` when `kind` cannot handle the source kind or
/// was not compiled in.
pub fn create_backend(
    kind: BackendKind,
    source: &Path,
    config: &BackendConfig,
) -> Result<Box<dyn SourceBackend>> {
    match kind {
        BackendKind::Spreadsheet => Ok(Box::new(spreadsheet::SpreadsheetBackend::new(source))),
        BackendKind::MdbTools => Ok(Box::new(mdbtools::MdbToolsBackend::new(
            source,
            config.mdbtools.clone(),
        ))),
        #[cfg(feature = "odbc")]
        BackendKind::Odbc => Ok(Box::new(odbc::OdbcBackend::new(source, config.odbc.clone())?)),
        #[cfg(not(feature = "odbc"))]
        BackendKind::Odbc => Err(TabExportError::backend_unavailable(
            BackendKind::Odbc,
            "compile with --features odbc to enable ODBC support",
        )),
    }
}

/// Candidate backends for a source, in probe order.
///
/// # Errors
/// Returns a configuration error if the preference names a backend that
/// cannot read this kind of source.
pub fn candidate_backends(
    source_kind: SourceKind,
    preference: BackendPreference,
) -> Result<Vec<BackendKind>> {
    match source_kind {
        SourceKind::Workbook => match preference {
            BackendPreference::Auto => Ok(vec![BackendKind::Spreadsheet]),
            other => Err(TabExportError::configuration(format!(
                "the {} backend cannot read workbooks",
                other
            ))),
        },
        SourceKind::AccessDatabase => Ok(preference.access_candidates()),
    }
}

/// Selects the first backend that can read `source`.
///
/// Candidates are probed in order; a candidate that fails is recorded and
/// the next one is tried.
///
/// # Errors
/// - Configuration error for an unrecognised extension
/// - `NoBackendAvailable` listing every attempt when all candidates fail
pub async fn select_backend(
    source: &Path,
    preference: BackendPreference,
    config: &BackendConfig,
) -> Result<Box<dyn SourceBackend>> {
    let source_kind = SourceKind::from_path(source).ok_or_else(|| {
        TabExportError::configuration(format!(
            "unsupported file type: {} (expected .xlsx, .xlsm, .xls, .xlsb, .accdb or .mdb)",
            source.display()
        ))
    })?;

    let mut attempts = Vec::new();
    for kind in candidate_backends(source_kind, preference)? {
        debug!("Probing {} backend for {}", kind, source.display());

        let backend = match create_backend(kind, source, config) {
            Ok(backend) => backend,
            Err(e) => {
                debug!("{} backend rejected: {}", kind, e);
                attempts.push(BackendAttempt {
                    backend: kind,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match backend.probe().await {
            Ok(()) => {
                info!("Using {} backend", kind);
                return Ok(backend);
            }
            Err(e) => {
                debug!("{} probe failed: {}", kind, e);
                attempts.push(BackendAttempt {
                    backend: kind,
                    reason: e.to_string(),
                });
            }
        }
    }

    Err(TabExportError::NoBackendAvailable { attempts })
}

/// Machine-level availability of one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendAvailability {
    /// Backend described by this entry
    pub backend: BackendKind,
    /// Whether support was built into this binary
    pub compiled: bool,
    /// Whether the tool or driver is present; `None` when not compiled in
    pub available: Option<bool>,
    /// Human-readable explanation shown by `backends`
    pub detail: String,
}

/// Reports which backends are compiled in and usable on this machine.
pub async fn backend_availability(config: &BackendConfig) -> Vec<BackendAvailability> {
    let mut report = vec![BackendAvailability {
        backend: BackendKind::Spreadsheet,
        compiled: true,
        available: Some(true),
        detail: "built in (xlsx, xlsm, xls, xlsb)".to_string(),
    }];

    let mdbtools_found = mdbtools::tools_available(&config.mdbtools).await;
    report.push(BackendAvailability {
        backend: BackendKind::MdbTools,
        compiled: true,
        available: Some(mdbtools_found),
        detail: if mdbtools_found {
            format!("{} found", config.mdbtools.tables_program.display())
        } else {
            format!(
                "{} not found on PATH (install the mdbtools package)",
                config.mdbtools.tables_program.display()
            )
        },
    });

    #[cfg(feature = "odbc")]
    report.push(odbc::availability(&config.odbc).await);

    #[cfg(not(feature = "odbc"))]
    report.push(BackendAvailability {
        backend: BackendKind::Odbc,
        compiled: false,
        available: None,
        detail: "not compiled in (build with --features odbc)".to_string(),
    });

    report
}
