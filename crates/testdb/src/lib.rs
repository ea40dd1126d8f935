//! # testdb
//!
//! Per-session PostgreSQL test databases.
//!
//! A test suite points testdb at an administrative database it may create
//! and drop databases from. For each session testdb creates a sibling
//! database named `test_<base>`, hands out a single-connection engine bound
//! to it, and drops it again when the session ends.
//!
//! ## Features
//!
//! - Test URL derived from the base URL by prefixing the database name
//! - Administrative statements over a fresh connection to the base database,
//!   closed on every exit path
//! - Optional removal of a database left behind by a previous session
//! - Engine capped at one connection, session time zone fixed to UTC
//! - Session fixtures that tear down even when the test body panics
//!
//! ## Example
//!
//! ```rust,no_run
//! use testdb::TestingDb;
//!
//! # async fn example() -> testdb::Result<()> {
//! let db = TestingDb::new("postgresql://postgres@localhost/appdb", false)?;
//! assert_eq!(db.database_name(), "test_appdb");
//!
//! db.create_database().await?;
//! let engine = db.create_engine().await?;
//! sqlx::raw_sql("CREATE TABLE t (id int)").execute(engine.pool()).await.ok();
//!
//! engine.dispose().await;
//! db.drop_database().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod admin;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod session;
pub mod sql;

#[cfg(test)]
pub(crate) mod mock;

pub use admin::{AdminConnection, AdminConnector, AdminScope, PgAdminConnector};
pub use config::{EngineConfig, SessionConfig};
pub use engine::Engine;
pub use error::{Error, Result};
pub use lifecycle::TestingDb;
pub use session::{TestSession, run_session, run_session_with};
pub use testdb_url::{DbUrl, IntoDbUrl};
