//! Interactive input for arguments left off the command line.

use dialoguer::Input;
use std::path::PathBuf;
use tabexport_core::{DatabasePassword, Result, TabExportError};

/// Asks for a path; surrounding whitespace and quotes are stripped.
pub fn prompt_path(prompt: &str) -> Result<PathBuf> {
    let answer: String = Input::new()
        .with_prompt(prompt)
        .interact_text()
        .map_err(|e| TabExportError::configuration(format!("Failed to read input: {}", e)))?;

    let path = clean_path_input(&answer);
    if path.is_empty() {
        return Err(TabExportError::configuration("No path given"));
    }
    Ok(PathBuf::from(path))
}

/// Trims whitespace and one pair of matching quotes (drag-and-drop paths).
pub fn clean_path_input(input: &str) -> &str {
    let trimmed = input.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    trimmed
}

/// Reads the database password without echo.
///
/// An empty answer means no password.
pub fn prompt_password() -> Result<Option<DatabasePassword>> {
    let password = DatabasePassword::new(
        rpassword::prompt_password("Database password: ").map_err(|e| {
            TabExportError::configuration(format!("Failed to read password: {}", e))
        })?,
    );

    if password.is_empty() {
        return Ok(None);
    }
    Ok(Some(password))
}
