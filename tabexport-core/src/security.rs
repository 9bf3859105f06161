//! Password handling for protected Access databases.
//!
//! Passwords live in `Zeroizing` buffers and never appear in `Debug` output.
//! ODBC connection strings are redacted before they reach a log line or an
//! error message.

use regex::Regex;
use std::sync::OnceLock;
use zeroize::Zeroizing;

/// Database password with automatic memory zeroing.
///
/// # Example
///
/// ```rust
/// use tabexport_core::security::DatabasePassword;
///
/// let password = DatabasePassword::new("s3cret".to_string());
/// assert_eq!(password.expose(), "s3cret");
/// assert!(!format!("{:?}", password).contains("s3cret"));
/// ```
#[derive(Clone)]
pub struct DatabasePassword(Zeroizing<String>);

impl DatabasePassword {
    /// Wraps a password; the buffer is zeroed when the value is dropped.
    pub fn new(password: String) -> Self {
        Self(Zeroizing::new(password))
    }

    /// Returns the password for building a connection string.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True for an empty password.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for DatabasePassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DatabasePassword(****)")
    }
}

fn password_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // PWD values may be brace-quoted, with `}` escaped as `}}`: PWD={a;b}}c};
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(PWD|PASSWORD)\s*=\s*(\{(?:[^}]|\}\})*\}|[^;]*)")
            .expect("Invalid password pattern")
    })
}

/// Masks password attributes in an ODBC connection string.
///
/// ```rust
/// use tabexport_core::security::redact_connection_string;
///
/// let redacted = redact_connection_string("DRIVER={Access};DBQ=C:\\db.accdb;PWD=hunter2;");
/// assert_eq!(redacted, "DRIVER={Access};DBQ=C:\\db.accdb;PWD=****;");
/// ```
pub fn redact_connection_string(connection_string: &str) -> String {
    password_pattern()
        .replace_all(connection_string, "$1=****")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_plain_password() {
        let redacted = redact_connection_string("DRIVER={X};DBQ=/data/a.accdb;PWD=secret;");
        assert!(!redacted.contains("secret"));
        assert!(redacted.contains("DBQ=/data/a.accdb"));
        assert!(redacted.ends_with("PWD=****;"));
    }

    #[test]
    fn test_redact_braced_password_with_semicolon() {
        let redacted = redact_connection_string("DBQ=a.mdb;pwd={se;cret};");
        assert!(!redacted.contains("se;cret"));
        assert!(!redacted.contains("cret"));
        assert_eq!(redacted, "DBQ=a.mdb;pwd=****;");
    }

    #[test]
    fn test_redact_braced_password_with_escaped_brace() {
        let redacted = redact_connection_string("DRIVER={X};DBQ=a.accdb;PWD={ab}}cd};");
        assert_eq!(redacted, "DRIVER={X};DBQ=a.accdb;PWD=****;");
        assert!(!redacted.contains("cd"));
    }

    #[test]
    fn test_redact_without_password_is_identity() {
        let conn = "DRIVER={Microsoft Access Driver (*.mdb, *.accdb)};DBQ=x.accdb;";
        assert_eq!(redact_connection_string(conn), conn);
    }

    #[test]
    fn test_password_debug_is_masked() {
        let password = DatabasePassword::new("topsecret".to_string());
        let debug = format!("{:?}", password);
        assert!(!debug.contains("topsecret"));
        assert!(!password.is_empty());
    }
}
