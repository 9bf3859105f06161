//! Table and sheet selection.
//!
//! Access databases carry internal tables (`MSysObjects`, `~TMPCLP...`) that
//! are never useful as CSV. Users can further narrow the export to named
//! tables or drop tables matching glob patterns.

use crate::{Result, error::TabExportError};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Name prefixes of Access-internal tables.
pub const SYSTEM_TABLE_PREFIXES: &[&str] = &["MSys", "~"];

/// Returns true for Access-internal tables.
pub fn is_system_table(name: &str) -> bool {
    SYSTEM_TABLE_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Selection rules applied to the names a backend enumerates.
///
/// # Example
/// ```rust
/// use tabexport_core::filter::TableFilter;
///
/// let filter = TableFilter::new()
///     .with_skip_system(true)
///     .with_exclude(vec!["tmp_*".to_string()]);
///
/// let tables = vec![
///     "MSysObjects".to_string(),
///     "Assets".to_string(),
///     "tmp_import".to_string(),
/// ];
/// assert_eq!(filter.apply(tables).unwrap(), vec!["Assets".to_string()]);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableFilter {
    /// Drop names starting with `MSys` or `~`
    pub skip_system: bool,
    /// Exact names to keep; empty keeps everything
    pub include: Vec<String>,
    /// Glob patterns (`*`, `?`) to drop, matched case-insensitively
    pub exclude: Vec<String>,
}

impl TableFilter {
    /// Creates a filter that keeps every table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter used for Access databases: system tables skipped.
    pub fn for_access() -> Self {
        Self::new().with_skip_system(true)
    }

    /// Builder method to enable/disable skipping Access system tables.
    pub fn with_skip_system(mut self, skip_system: bool) -> Self {
        self.skip_system = skip_system;
        self
    }

    /// Builder method to set the exact table names to keep.
    pub fn with_include(mut self, include: Vec<String>) -> Self {
        self.include = include;
        self
    }

    /// Builder method to set the exclude patterns.
    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    /// Validates the exclude patterns.
    ///
    /// # Errors
    /// Returns error if a pattern is empty.
    pub fn validate(&self) -> Result<()> {
        if let Some(pattern) = self.exclude.iter().find(|p| p.trim().is_empty()) {
            return Err(TabExportError::configuration(format!(
                "exclude pattern '{}' is empty",
                pattern
            )));
        }
        if let Some(name) = self.include.iter().find(|n| n.trim().is_empty()) {
            return Err(TabExportError::configuration(format!(
                "table name '{}' is empty",
                name
            )));
        }
        Ok(())
    }

    /// Applies the rules, keeping the source order of `tables`.
    ///
    /// Tables named in `include` are kept even when they look like system
    /// tables.
    ///
    /// # Errors
    /// Returns `TableNotFound` when an included name is not in `tables`.
    pub fn apply(&self, tables: Vec<String>) -> Result<Vec<String>> {
        self.validate()?;

        if let Some(missing) = self.include.iter().find(|name| !tables.contains(name)) {
            let available = tables
                .into_iter()
                .filter(|t| !self.skip_system || !is_system_table(t))
                .collect();
            return Err(TabExportError::TableNotFound {
                table: missing.clone(),
                available,
            });
        }

        let excludes = self
            .exclude
            .iter()
            .map(|pattern| glob_to_regex(pattern))
            .collect::<Result<Vec<_>>>()?;

        Ok(tables
            .into_iter()
            .filter(|name| {
                if !self.include.is_empty() {
                    return self.include.contains(name);
                }
                !(self.skip_system && is_system_table(name))
            })
            .filter(|name| !excludes.iter().any(|re| re.is_match(name)))
            .collect())
    }
}

/// Compiles a shell-style glob (`*`, `?`) into an anchored regex.
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut expression = String::with_capacity(pattern.len().saturating_add(8));
    expression.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expression.push_str(".*"),
            '?' => expression.push('.'),
            other => expression.push_str(&regex::escape(&other.to_string())),
        }
    }
    expression.push('$');

    RegexBuilder::new(&expression)
        .case_insensitive(true)
        .build()
        .map_err(|e| {
            TabExportError::configuration(format!("invalid exclude pattern '{}': {}", pattern, e))
        })
}
