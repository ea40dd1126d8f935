//! # testdb-url
//!
//! Connection URL model for the testdb workspace.
//!
//! A [`DbUrl`] is the structured form of a PostgreSQL connection URL:
//! scheme, user, password, host, port, database name and query parameters.
//! The testdb lifecycle works with two of them per session:
//!
//! ```text
//! base URL   postgresql://user@host/appdb        (administrative database)
//! test URL   postgresql://user@host/test_appdb   (derived, used by the tests)
//! ```
//!
//! The test URL differs from the base URL only in its database name, which
//! is always `"test_" + base.database`.
//!
//! ## Example
//!
//! ```rust
//! use testdb_url::IntoDbUrl;
//!
//! let base = "postgresql://user@host/appdb".into_db_url().unwrap();
//! let test = base.derive_test_url();
//!
//! assert_eq!(test.database(), "test_appdb");
//! assert_eq!(test.host(), base.host());
//! assert_eq!(test.to_string(), "postgresql://user@host/test_appdb");
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod db_url;

pub use crate::error::UrlError;
pub use crate::db_url::{DbUrl, IntoDbUrl, SUPPORTED_SCHEMES, TEST_DB_PREFIX};
