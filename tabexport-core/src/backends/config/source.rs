//! Backend selection and per-backend settings.

use crate::{models::BackendKind, security::DatabasePassword};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Microsoft Access ODBC driver names, in probe order.
pub const ACCESS_ODBC_DRIVERS: &[&str] = &[
    "Microsoft Access Driver (*.mdb, *.accdb)",
    "Microsoft Access Driver (*.mdb)",
    "Driver do Microsoft Access (*.mdb)",
];

/// Which backend the user asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendPreference {
    /// Probe candidates in order, first success wins
    #[default]
    Auto,
    /// Only the mdbtools command-line programs
    MdbTools,
    /// Only the Access ODBC driver
    Odbc,
}

impl BackendPreference {
    /// Candidate backends for an Access database, in probe order.
    pub fn access_candidates(self) -> Vec<BackendKind> {
        match self {
            BackendPreference::Auto => {
                let mut candidates = vec![BackendKind::MdbTools];
                if cfg!(feature = "odbc") {
                    candidates.push(BackendKind::Odbc);
                }
                candidates
            }
            BackendPreference::MdbTools => vec![BackendKind::MdbTools],
            BackendPreference::Odbc => vec![BackendKind::Odbc],
        }
    }
}

impl std::str::FromStr for BackendPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "mdbtools" | "mdb-tools" | "mdb" => Ok(Self::MdbTools),
            "odbc" => Ok(Self::Odbc),
            other => Err(format!(
                "unknown backend '{}' (expected auto, mdbtools or odbc)",
                other
            )),
        }
    }
}

impl std::fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendPreference::Auto => write!(f, "auto"),
            BackendPreference::MdbTools => write!(f, "mdbtools"),
            BackendPreference::Odbc => write!(f, "odbc"),
        }
    }
}

/// Executables used by the mdbtools backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdbToolsConfig {
    /// Program listing tables (`mdb-tables`)
    pub tables_program: PathBuf,
    /// Program exporting one table as CSV (`mdb-export`)
    pub export_program: PathBuf,
}

impl Default for MdbToolsConfig {
    fn default() -> Self {
        Self {
            tables_program: PathBuf::from("mdb-tables"),
            export_program: PathBuf::from("mdb-export"),
        }
    }
}

impl MdbToolsConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the table listing program.
    pub fn with_tables_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.tables_program = program.into();
        self
    }

    /// Builder method to set the table export program.
    pub fn with_export_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.export_program = program.into();
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns error if either program name is empty.
    pub fn validate(&self) -> crate::Result<()> {
        if self.tables_program.as_os_str().is_empty() || self.export_program.as_os_str().is_empty()
        {
            return Err(crate::error::TabExportError::configuration(
                "mdbtools program names cannot be empty",
            ));
        }
        Ok(())
    }
}

/// Settings for the ODBC backend.
///
/// # Security
/// The password is never serialized and is masked in `Debug` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OdbcConfig {
    /// Driver names tried in order; the first one installed is used
    pub drivers: Vec<String>,
    /// Rows fetched per round trip
    pub batch_size: usize,
    /// Upper bound for a single text value, in bytes
    pub max_text_len: usize,
    /// Database password, sent as `PWD`
    #[serde(skip)]
    pub password: Option<DatabasePassword>,
}

impl Default for OdbcConfig {
    fn default() -> Self {
        Self {
            drivers: ACCESS_ODBC_DRIVERS.iter().map(|d| d.to_string()).collect(),
            batch_size: 1000,
            max_text_len: 65_536,
            password: None,
        }
    }
}

impl OdbcConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the database password.
    pub fn with_password(mut self, password: DatabasePassword) -> Self {
        self.password = Some(password);
        self
    }

    /// Builder method to set the driver candidates.
    pub fn with_drivers(mut self, drivers: Vec<String>) -> Self {
        self.drivers = drivers;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns error if no driver candidates are configured or sizes are zero.
    pub fn validate(&self) -> crate::Result<()> {
        if self.drivers.is_empty() {
            return Err(crate::error::TabExportError::configuration(
                "at least one ODBC driver name is required",
            ));
        }
        if self.batch_size == 0 {
            return Err(crate::error::TabExportError::configuration(
                "batch_size must be greater than 0",
            ));
        }
        if self.max_text_len == 0 {
            return Err(crate::error::TabExportError::configuration(
                "max_text_len must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Everything backend construction needs.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    /// mdbtools programs
    pub mdbtools: MdbToolsConfig,
    /// ODBC driver settings
    pub odbc: OdbcConfig,
}

impl BackendConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the mdbtools settings.
    pub fn with_mdbtools(mut self, mdbtools: MdbToolsConfig) -> Self {
        self.mdbtools = mdbtools;
        self
    }

    /// Builder method to set the ODBC settings.
    pub fn with_odbc(mut self, odbc: OdbcConfig) -> Self {
        self.odbc = odbc;
        self
    }

    /// Validates every backend section.
    pub fn validate(&self) -> crate::Result<()> {
        self.mdbtools.validate()?;
        self.odbc.validate()
    }
}
