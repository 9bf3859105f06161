//! Excel and Access to CSV conversion tool.
//!
//! Reads Excel workbooks and Microsoft Access databases and writes one CSV
//! file per sheet or table.
//!
//! # Guarantees
//! - Sources are opened read-only
//! - Column order is preserved in every CSV header
//! - Database passwords are never logged

use clap::Parser;
use tabexport::{Cli, convert, output::error_lines};
use tabexport_core::init_logging;
use tracing::debug;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    debug!("tabexport {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = convert::run(&cli).await {
        for line in error_lines(&e) {
            eprintln!("{}", line);
        }
        std::process::exit(1);
    }
}
