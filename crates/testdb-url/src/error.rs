//! URL error types.

use thiserror::Error;

/// Errors that can occur while parsing a connection URL.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UrlError {
    /// The input is not a syntactically valid URL.
    #[error("invalid connection URL: {0}")]
    Parse(#[from] ::url::ParseError),

    /// The URL scheme does not name a supported database engine.
    #[error("unsupported URL scheme `{0}` (expected postgres or postgresql)")]
    UnsupportedScheme(String),

    /// The URL has no database name in its path.
    #[error("connection URL does not name a database")]
    MissingDatabase,

    /// A percent-encoded component does not decode to UTF-8.
    #[error("invalid percent-encoding in {component}")]
    InvalidEncoding {
        /// The URL component that failed to decode.
        component: &'static str,
    },
}

impl UrlError {
    /// Check if this error means the URL lacks a database name.
    #[must_use]
    pub fn is_missing_database(&self) -> bool {
        matches!(self, Self::MissingDatabase)
    }
}
