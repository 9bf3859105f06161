//! Configuration types for source backends.
//!
//! - `ExportConfig`: what to export and how empty tables are treated
//! - `MdbToolsConfig`: executable names for the mdbtools backend
//! - `OdbcConfig`: driver candidates and optional database password
//! - `BackendConfig`: the above bundled for backend selection
//!
//! # Security
//! The ODBC password is held in a zeroizing buffer and skipped by serde.

mod export;
mod source;

pub use export::ExportConfig;
pub use source::{
    ACCESS_ODBC_DRIVERS, BackendConfig, BackendPreference, MdbToolsConfig, OdbcConfig,
};
