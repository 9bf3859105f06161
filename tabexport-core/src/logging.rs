//! Shared logging setup for the tabexport binary.
//!
//! Diagnostics go to stderr through `tracing`; stdout is left for the
//! per-table progress lines and summaries.

use crate::Result;
use tracing_subscriber::EnvFilter;

/// Maps CLI verbosity flags to a filter directive.
///
/// quiet → `error`, 0 → `info`, 1 → `debug`, 2+ → `trace`.
pub fn level_directive(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

/// Initializes structured logging based on verbosity level.
///
/// When `RUST_LOG` is set it takes precedence over the verbosity flags.
///
/// # Example
/// ```rust,no_run
/// use tabexport_core::logging::init_logging;
///
/// // Initialize at DEBUG level
/// init_logging(1, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let filter = match std::env::var_os("RUST_LOG") {
        Some(_) => EnvFilter::try_from_default_env().map_err(|e| {
            crate::error::TabExportError::configuration(format!("Invalid RUST_LOG value: {}", e))
        })?,
        None => EnvFilter::new(level_directive(verbose, quiet)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| {
            crate::error::TabExportError::configuration(format!(
                "Failed to initialize logging: {}",
                e
            ))
        })?;

    Ok(())
}
