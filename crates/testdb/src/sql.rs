//! Administrative statement text.
//!
//! Only three statements ever go over the wire: `CREATE DATABASE`,
//! `DROP DATABASE` and `ROLLBACK`. Database names are sent as quoted
//! identifiers so the server stores exactly the name the test URL carries.

use crate::error::{Error, Result};

/// Statement issued to clear any transaction state left by the driver.
pub const ROLLBACK: &str = "ROLLBACK";

/// PostgreSQL truncates identifiers longer than this many bytes.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// SQLSTATE `invalid_catalog_name`: the database does not exist.
pub const SQLSTATE_INVALID_CATALOG_NAME: &str = "3D000";

/// SQLSTATE `duplicate_database`: the database already exists.
pub const SQLSTATE_DUPLICATE_DATABASE: &str = "42P04";

/// Quote an identifier, doubling any embedded double quotes.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Generate SQL to create a database.
#[must_use]
pub fn create_database(name: &str) -> String {
    format!("CREATE DATABASE {}", quote_identifier(name))
}

/// Generate SQL to drop a database.
#[must_use]
pub fn drop_database(name: &str) -> String {
    format!("DROP DATABASE {}", quote_identifier(name))
}

/// Check that `name` survives the round trip through the server unchanged.
pub fn validate_database_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.len() > MAX_IDENTIFIER_LEN {
        "name exceeds 63 bytes and would be truncated by the server"
    } else if name.contains('\0') {
        "name contains a NUL byte"
    } else {
        return Ok(());
    };

    Err(Error::InvalidDatabaseName {
        name: name.to_string(),
        reason,
    })
}
