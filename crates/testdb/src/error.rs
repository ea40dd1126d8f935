//! Error types for test database lifecycle operations.

use std::borrow::Cow;

use thiserror::Error;
use testdb_url::UrlError;

use crate::sql;

/// Errors that can occur while creating, using or dropping a test database.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The base connection URL could not be parsed.
    #[error("invalid base URL: {0}")]
    Url(#[from] UrlError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The derived test database name is not a usable identifier.
    #[error("invalid test database name `{name}`: {reason}")]
    InvalidDatabaseName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Opening a connection failed.
    #[error("failed to connect to {url}: {source}")]
    Connect {
        /// Connection target, with the password redacted.
        url: String,
        /// Driver error.
        #[source]
        source: sqlx::Error,
    },

    /// An administrative statement failed on the server.
    ///
    /// This is the primary caller-visible failure: `CREATE DATABASE` on a
    /// leftover test database, or `DROP DATABASE` on a missing one.
    #[error("administrative statement `{statement}` failed: {source}")]
    Statement {
        /// The statement text.
        statement: String,
        /// Driver error.
        #[source]
        source: sqlx::Error,
    },

    /// Closing the administrative connection failed.
    #[error("failed to release administrative connection: {0}")]
    Release(#[source] sqlx::Error),
}

impl Error {
    pub(crate) fn statement(statement: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Statement {
            statement: statement.into(),
            source,
        }
    }

    /// The underlying driver error, if there is one.
    #[must_use]
    pub fn driver_error(&self) -> Option<&sqlx::Error> {
        match self {
            Self::Connect { source, .. } | Self::Statement { source, .. } | Self::Release(source) => {
                Some(source)
            }
            _ => None,
        }
    }

    /// SQLSTATE code reported by the server, if this error came from one.
    #[must_use]
    pub fn sqlstate(&self) -> Option<Cow<'_, str>> {
        self.driver_error().and_then(sqlstate)
    }

    /// Check if the server reported that the database does not exist.
    #[must_use]
    pub fn is_database_missing(&self) -> bool {
        self.sqlstate().as_deref() == Some(sql::SQLSTATE_INVALID_CATALOG_NAME)
    }

    /// Check if the server reported that the database already exists.
    ///
    /// Seen from `create_database` when a previous session left its
    /// database behind and `drop_existing` is off.
    #[must_use]
    pub fn is_database_exists(&self) -> bool {
        self.sqlstate().as_deref() == Some(sql::SQLSTATE_DUPLICATE_DATABASE)
    }
}

/// SQLSTATE code carried by a driver error.
pub(crate) fn sqlstate(err: &sqlx::Error) -> Option<Cow<'_, str>> {
    err.as_database_error().and_then(|db_err| db_err.code())
}

/// Result type for testdb operations.
pub type Result<T> = std::result::Result<T, Error>;
