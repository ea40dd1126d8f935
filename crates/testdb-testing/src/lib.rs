//! # testdb-testing
//!
//! Test infrastructure for testdb development.
//!
//! Provides a PostgreSQL server for the live integration suites, either the
//! one named by `TESTDB_URL` or a throwaway container started through
//! testcontainers, plus helpers that inspect the server catalog.
//!
//! ## Example
//!
//! ```rust,ignore
//! use testdb_testing::TestServer;
//!
//! #[tokio::test]
//! #[ignore = "Requires PostgreSQL or Docker"]
//! async fn test_with_real_server() {
//!     let server = TestServer::start().await.unwrap();
//!     let db = testdb::TestingDb::new(server.base_url(), false).unwrap();
//!     db.create_database().await.unwrap();
//!     assert!(server.database_exists(db.database_name()).await.unwrap());
//!     db.drop_database().await.unwrap();
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod container;
pub mod fixtures;

pub use container::PostgresContainer;
pub use fixtures::{HarnessError, TestServer};
