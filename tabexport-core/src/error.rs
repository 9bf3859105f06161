//! Error types for source access and CSV export.
//!
//! Connection strings may carry a database password (`PWD=`). Nothing in this
//! module formats a raw connection string; callers pass redacted context only.

use crate::models::BackendKind;
use thiserror::Error;

/// A backend that was tried during probing and why it was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendAttempt {
    /// Backend that was probed
    pub backend: BackendKind,
    /// Why the probe failed
    pub reason: String,
}

impl std::fmt::Display for BackendAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.backend, self.reason)
    }
}

fn summarize_attempts(attempts: &[BackendAttempt]) -> String {
    if attempts.is_empty() {
        return "no candidates".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Main error type for tabexport operations.
#[derive(Debug, Error)]
pub enum TabExportError {
    /// A specific backend cannot be used on this machine or for this source
    #[error("{backend} backend unavailable: {reason}")]
    BackendUnavailable { backend: BackendKind, reason: String },

    /// Every candidate backend failed its probe
    #[error("No backend could open the source: {}", summarize_attempts(.attempts))]
    NoBackendAvailable { attempts: Vec<BackendAttempt> },

    /// The source file could not be opened or enumerated
    #[error("Failed to open source: {context}")]
    SourceOpen {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Reading rows from one table or sheet failed
    #[error("Failed to read '{table}': {context}")]
    TableRead {
        table: String,
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An external export tool exited unsuccessfully
    #[error("Export of '{table}' failed: {message}")]
    ExportTool { table: String, message: String },

    /// CSV encoding or decoding failed
    #[error("CSV operation failed: {context}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A table requested by name does not exist in the source
    #[error("Table '{table}' not found. Available: {}", .available.join(", "))]
    TableNotFound {
        table: String,
        available: Vec<String>,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// One or more tables failed while strict mode was on
    #[error("{failed} of {total} exports failed")]
    ExportsFailed { failed: usize, total: usize },
}

/// Convenience type alias for Results with TabExportError
pub type Result<T> = std::result::Result<T, TabExportError>;

impl TabExportError {
    /// Creates a backend-unavailable error
    pub fn backend_unavailable(backend: BackendKind, reason: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend,
            reason: reason.into(),
        }
    }

    /// Creates a source-open error with context
    pub fn source_open<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::SourceOpen {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a table read error with context
    pub fn table_read<E>(table: impl Into<String>, context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::TableRead {
            table: table.into(),
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a CSV error with context
    pub fn csv(context: impl Into<String>, error: csv::Error) -> Self {
        Self::Csv {
            context: context.into(),
            source: error,
        }
    }

    /// Creates an I/O error with context
    pub fn io(context: impl Into<String>, error: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source: error,
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns true when the error means "try the next backend" rather than a
    /// problem with the source itself.
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable { .. } | Self::NoBackendAvailable { .. }
        )
    }
}
