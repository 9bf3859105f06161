//! Export behaviour configuration.

use crate::filter::TableFilter;
use serde::{Deserialize, Serialize};

/// Configuration for one conversion run.
///
/// # Example
/// ```rust
/// use tabexport_core::backends::ExportConfig;
/// use tabexport_core::filter::TableFilter;
///
/// let config = ExportConfig::new()
///     .with_skip_empty(true)
///     .with_filter(TableFilter::for_access());
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Remove and report as skipped tables with no data rows
    pub skip_empty: bool,
    /// Export every sheet of a workbook instead of only the first
    pub all_sheets: bool,
    /// Table/sheet selection rules
    pub filter: TableFilter,
}

impl ExportConfig {
    /// Creates a configuration that exports everything, keeping empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns error if the table filter is invalid.
    pub fn validate(&self) -> crate::Result<()> {
        self.filter.validate()
    }

    /// Builder method to drop files of tables without data rows.
    pub fn with_skip_empty(mut self, skip_empty: bool) -> Self {
        self.skip_empty = skip_empty;
        self
    }

    /// Builder method to export every sheet instead of the first.
    pub fn with_all_sheets(mut self, all_sheets: bool) -> Self {
        self.all_sheets = all_sheets;
        self
    }

    /// Builder method to set the table filter.
    pub fn with_filter(mut self, filter: TableFilter) -> Self {
        self.filter = filter;
        self
    }
}
