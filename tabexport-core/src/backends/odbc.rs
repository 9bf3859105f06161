//! ODBC backend: Access databases through the Microsoft Access driver.
//!
//! Compiled only with the `odbc` feature because `odbc-api` links the system
//! driver manager. The driver is picked from `OdbcConfig::drivers`, first
//! installed wins. Each operation opens its own connection on the blocking
//! pool; the `Environment` is shared.
//!
//! # Security
//! The connection string may contain `PWD=`. It is only ever logged through
//! `redact_connection_string`.

use super::{BackendAvailability, BackendFeature, OdbcConfig, SourceBackend};
use crate::{
    Result,
    error::TabExportError,
    export::create_csv_writer,
    models::BackendKind,
    security::redact_connection_string,
};
use async_trait::async_trait;
use odbc_api::{ConnectionOptions, Cursor, Environment, ResultSetMetadata, buffers::TextRowSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

/// 0-based column of TABLE_NAME in the SQLTables result set.
const TABLE_NAME_COLUMN: usize = 2;

/// Reads Access databases through an installed ODBC driver.
pub struct OdbcBackend {
    env: Arc<Environment>,
    path: PathBuf,
    driver: String,
    config: OdbcConfig,
}

impl std::fmt::Debug for OdbcBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OdbcBackend")
            .field("path", &self.path)
            .field("driver", &self.driver)
            // Note: password is intentionally omitted
            .finish_non_exhaustive()
    }
}

/// Picks the first configured driver that is installed.
pub fn choose_driver(candidates: &[String], installed: &[String]) -> Option<String> {
    candidates
        .iter()
        .find(|candidate| installed.iter().any(|d| d == *candidate))
        .cloned()
}

/// Wraps an attribute value in braces, doubling any `}` inside it.
fn braced(value: &str) -> String {
    format!("{{{}}}", value.replace('}', "}}"))
}

/// Builds `DRIVER={..};DBQ=..;` plus `PWD={..};` when a password is configured.
pub fn build_connection_string(driver: &str, path: &Path, config: &OdbcConfig) -> String {
    let mut connection_string = format!("DRIVER={};DBQ={};", braced(driver), path.display());
    if let Some(password) = config.password.as_ref().filter(|p| !p.is_empty()) {
        let password = Zeroizing::new(braced(password.expose()));
        connection_string.push_str("PWD=");
        connection_string.push_str(&password);
        connection_string.push(';');
    }
    connection_string
}

fn installed_drivers(env: &Environment) -> Result<Vec<String>> {
    let drivers = env.drivers().map_err(|e| {
        TabExportError::backend_unavailable(
            BackendKind::Odbc,
            format!("cannot list ODBC drivers: {}", e),
        )
    })?;
    Ok(drivers.into_iter().map(|d| d.description).collect())
}

impl OdbcBackend {
    /// Creates a backend, resolving the driver from the installed list.
    ///
    /// # Errors
    /// Returns `BackendUnavailable` if the driver manager cannot be loaded or
    /// none of the candidate drivers is installed.
    pub fn new(path: impl Into<PathBuf>, config: OdbcConfig) -> Result<Self> {
        config.validate()?;

        let env = Environment::new().map_err(|e| {
            TabExportError::backend_unavailable(
                BackendKind::Odbc,
                format!("cannot initialise the ODBC driver manager: {}", e),
            )
        })?;

        let installed = installed_drivers(&env)?;
        let driver = choose_driver(&config.drivers, &installed).ok_or_else(|| {
            let listed = if installed.is_empty() {
                "none".to_string()
            } else {
                installed.join(", ")
            };
            TabExportError::backend_unavailable(
                BackendKind::Odbc,
                format!(
                    "Microsoft Access Database Engine not found (installed drivers: {})",
                    listed
                ),
            )
        })?;
        debug!("Using ODBC driver: {}", driver);

        Ok(Self {
            env: Arc::new(env),
            path: path.into(),
            driver,
            config,
        })
    }

    /// Driver selected for this database.
    pub fn driver(&self) -> &str {
        &self.driver
    }

    fn connection_string(&self) -> String {
        build_connection_string(&self.driver, &self.path, &self.config)
    }

    async fn with_connection<T, F>(&self, context: &'static str, task: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&odbc_api::Connection<'_>, &OdbcConfig) -> Result<T> + Send + 'static,
    {
        let env = Arc::clone(&self.env);
        let connection_string = self.connection_string();
        let config = self.config.clone();

        tokio::task::spawn_blocking(move || {
            debug!(
                "Connecting with {}",
                redact_connection_string(&connection_string)
            );
            let connection = env
                .connect_with_connection_string(&connection_string, ConnectionOptions::default())
                .map_err(|e| {
                    TabExportError::source_open("cannot connect to Access database via ODBC", e)
                })?;
            task(&connection, &config)
        })
        .await
        .map_err(|e| TabExportError::source_open(context, e))?
    }
}

fn list_tables_blocking(
    connection: &odbc_api::Connection<'_>,
    config: &OdbcConfig,
) -> Result<Vec<String>> {
    let mut cursor = connection
        .tables("", "", "", "TABLE")
        .map_err(|e| TabExportError::source_open("cannot enumerate tables", e))?;

    let mut buffers =
        TextRowSet::for_cursor(config.batch_size, &mut cursor, Some(config.max_text_len))
            .map_err(|e| TabExportError::source_open("cannot allocate table list buffer", e))?;
    let mut row_set_cursor = cursor
        .bind_buffer(&mut buffers)
        .map_err(|e| TabExportError::source_open("cannot bind table list buffer", e))?;

    let mut tables = Vec::new();
    while let Some(batch) = row_set_cursor
        .fetch()
        .map_err(|e| TabExportError::source_open("cannot fetch table list", e))?
    {
        for row in 0..batch.num_rows() {
            if let Some(name) = batch.at(TABLE_NAME_COLUMN, row) {
                tables.push(String::from_utf8_lossy(name).into_owned());
            }
        }
    }
    Ok(tables)
}

/// Maps a fetch error, turning a value too large for its buffer into a
/// per-table failure naming the column instead of a silently cut value.
fn fetch_error(
    table: &str,
    headers: &[String],
    max_text_len: usize,
    error: odbc_api::Error,
) -> TabExportError {
    match error {
        odbc_api::Error::TooLargeValueForBuffer {
            indicator,
            buffer_index,
        } => {
            let column = headers
                .get(buffer_index)
                .map_or_else(|| format!("#{}", buffer_index), |name| format!("'{}'", name));
            let size = indicator
                .map_or_else(|| "size unknown".to_string(), |len| format!("{} bytes", len));
            TabExportError::table_read(
                table,
                format!(
                    "value in column {} ({}) exceeds the {} byte text limit",
                    column, size, max_text_len
                ),
                error,
            )
        }
        other => TabExportError::table_read(table, "fetch failed", other),
    }
}

fn export_table_blocking(
    connection: &odbc_api::Connection<'_>,
    config: &OdbcConfig,
    table: &str,
    destination: &Path,
) -> Result<u64> {
    let query = format!("SELECT * FROM [{}]", table.replace(']', "]]"));
    let mut writer = create_csv_writer(destination)?;

    let Some(mut cursor) = connection
        .execute(&query, (), None)
        .map_err(|e| TabExportError::table_read(table, "query failed", e))?
    else {
        // Statement produced no result set: header-less empty file
        writer.flush().map_err(|e| {
            TabExportError::io(format!("Failed to flush {}", destination.display()), e)
        })?;
        return Ok(0);
    };

    let headers = cursor
        .column_names()
        .map_err(|e| TabExportError::table_read(table, "cannot read column names", e))?
        .collect::<std::result::Result<Vec<String>, _>>()
        .map_err(|e| TabExportError::table_read(table, "cannot read column names", e))?;
    writer.write_record(&headers).map_err(|e| {
        TabExportError::csv(format!("Failed to write {}", destination.display()), e)
    })?;

    let mut buffers =
        TextRowSet::for_cursor(config.batch_size, &mut cursor, Some(config.max_text_len))
            .map_err(|e| TabExportError::table_read(table, "cannot allocate row buffer", e))?;
    let mut row_set_cursor = cursor
        .bind_buffer(&mut buffers)
        .map_err(|e| TabExportError::table_read(table, "cannot bind row buffer", e))?;

    let mut rows: u64 = 0;
    while let Some(batch) = row_set_cursor
        .fetch_with_truncation_check(true)
        .map_err(|e| fetch_error(table, &headers, config.max_text_len, e))?
    {
        for row in 0..batch.num_rows() {
            // NULL becomes an empty field
            let record = (0..batch.num_cols()).map(|col| batch.at(col, row).unwrap_or(&[]));
            writer.write_record(record).map_err(|e| {
                TabExportError::csv(format!("Failed to write {}", destination.display()), e)
            })?;
            rows = rows.saturating_add(1);
        }
    }

    writer.flush().map_err(|e| {
        TabExportError::io(format!("Failed to flush {}", destination.display()), e)
    })?;
    Ok(rows)
}

#[async_trait]
impl SourceBackend for OdbcBackend {
    async fn probe(&self) -> Result<()> {
        if !self.path.is_file() {
            return Err(TabExportError::configuration(format!(
                "Access database not found: {}",
                self.path.display()
            )));
        }
        self.with_connection("ODBC probe task failed", |_, _| Ok(()))
            .await
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        self.with_connection("ODBC table listing task failed", list_tables_blocking)
            .await
    }

    async fn export_table(&self, table: &str, destination: &Path) -> Result<u64> {
        let table = table.to_string();
        let destination = destination.to_path_buf();
        self.with_connection("ODBC export task failed", move |connection, config| {
            export_table_blocking(connection, config, &table, &destination)
        })
        .await
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Odbc
    }

    fn supports_feature(&self, feature: BackendFeature) -> bool {
        matches!(
            feature,
            BackendFeature::TableEnumeration
                | BackendFeature::PasswordProtected
                | BackendFeature::HeaderFromSchema
        )
    }
}

/// Reports whether an Access ODBC driver is installed.
pub async fn availability(config: &OdbcConfig) -> BackendAvailability {
    let candidates = config.drivers.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let env = Environment::new().map_err(|e| e.to_string())?;
        let installed = installed_drivers(&env).map_err(|e| e.to_string())?;
        Ok::<_, String>(choose_driver(&candidates, &installed))
    })
    .await;

    let (available, detail) = match outcome {
        Ok(Ok(Some(driver))) => (true, format!("driver '{}' installed", driver)),
        Ok(Ok(None)) => (
            false,
            "no Microsoft Access ODBC driver installed".to_string(),
        ),
        Ok(Err(e)) => (false, e),
        Err(e) => (false, format!("driver check failed: {}", e)),
    };

    BackendAvailability {
        backend: BackendKind::Odbc,
        compiled: true,
        available: Some(available),
        detail,
    }
}
