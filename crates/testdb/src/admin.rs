//! Administrative connections.
//!
//! `CREATE DATABASE` and `DROP DATABASE` must run outside a transaction
//! block, and a database cannot be dropped over a connection to itself. The
//! lifecycle therefore issues them over a short-lived connection to the
//! *base* database, never the test database.
//!
//! The connection is modelled by two traits so the lifecycle can be driven
//! by something other than a live server:
//!
//! - [`AdminConnector`] opens a connection for a [`DbUrl`]
//! - [`AdminConnection`] executes statements and closes
//!
//! [`AdminScope`] pairs acquisition with release: every scope is either
//! released explicitly through [`AdminScope::release`], which closes the
//! connection whatever the outcome, or dropped, which drops the connection
//! and with it the socket.

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use testdb_url::DbUrl;

use crate::error::{Error, Result};
use crate::sql;

/// An open administrative connection.
///
/// Native async trait (Rust 2024 edition); implementations are used
/// statically and never as trait objects.
#[allow(async_fn_in_trait)]
pub trait AdminConnection: Sized {
    /// Execute one statement as a standalone command.
    async fn execute(&mut self, statement: &str) -> std::result::Result<(), sqlx::Error>;

    /// Gracefully close the connection.
    async fn close(self) -> std::result::Result<(), sqlx::Error>;
}

/// Opens administrative connections.
#[allow(async_fn_in_trait)]
pub trait AdminConnector {
    /// Connection type produced by this connector.
    type Connection: AdminConnection;

    /// Open a fresh, single-use connection to `url`.
    async fn connect(&self, url: &DbUrl) -> std::result::Result<Self::Connection, sqlx::Error>;
}

/// [`AdminConnector`] for PostgreSQL servers.
#[derive(Debug, Clone, Default)]
pub struct PgAdminConnector {
    application_name: Option<String>,
}

impl PgAdminConnector {
    /// Create a connector with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name reported to the server.
    #[must_use]
    pub fn application_name(mut self, name: Option<String>) -> Self {
        self.application_name = name;
        self
    }
}

impl AdminConnector for PgAdminConnector {
    type Connection = PgConnection;

    async fn connect(&self, url: &DbUrl) -> std::result::Result<PgConnection, sqlx::Error> {
        let mut options = connect_options(url)?;
        if let Some(name) = &self.application_name {
            options = options.application_name(name);
        }
        PgConnection::connect_with(&options).await
    }
}

impl AdminConnection for PgConnection {
    async fn execute(&mut self, statement: &str) -> std::result::Result<(), sqlx::Error> {
        // Simple query protocol: no prepared statement, no implicit transaction block.
        sqlx::raw_sql(statement).execute(self).await.map(|_| ())
    }

    async fn close(self) -> std::result::Result<(), sqlx::Error> {
        Connection::close(self).await
    }
}

/// Build driver connection options from a [`DbUrl`].
pub(crate) fn connect_options(url: &DbUrl) -> std::result::Result<PgConnectOptions, sqlx::Error> {
    url.to_string().parse()
}

/// A scoped administrative connection against the base database.
pub struct AdminScope<C: AdminConnection> {
    conn: C,
    database: String,
}

impl<C: AdminConnection> AdminScope<C> {
    /// Open a scope: connect to `base_url` and reset transaction state.
    ///
    /// A `ROLLBACK` is issued right after connecting so no implicit
    /// transaction is open when the administrative statement runs. If it
    /// fails the connection is closed before the error is returned.
    pub async fn open<K>(connector: &K, base_url: &DbUrl) -> Result<Self>
    where
        K: AdminConnector<Connection = C>,
    {
        tracing::trace!(database = base_url.database(), "opening administrative connection");

        let conn = connector
            .connect(base_url)
            .await
            .map_err(|source| Error::Connect {
                url: base_url.redacted(),
                source,
            })?;

        let mut scope = Self {
            conn,
            database: base_url.database().to_string(),
        };

        if let Err(source) = scope.execute(sql::ROLLBACK).await {
            return scope.release(Err(Error::statement(sql::ROLLBACK, source))).await;
        }
        Ok(scope)
    }

    /// Execute one statement over this scope's connection.
    ///
    /// The driver error is returned as-is so callers can inspect its
    /// SQLSTATE before deciding whether to propagate it.
    pub async fn execute(&mut self, statement: &str) -> std::result::Result<(), sqlx::Error> {
        tracing::debug!(database = %self.database, statement, "executing administrative statement");
        self.conn.execute(statement).await
    }

    /// Close the connection and hand back `outcome`.
    ///
    /// The connection is closed on success and on failure. An error in
    /// `outcome` takes precedence over a close error, which is then only
    /// logged.
    pub async fn release<T>(self, outcome: Result<T>) -> Result<T> {
        let Self { conn, database } = self;
        let closed = conn.close().await;
        tracing::trace!(database = %database, "administrative connection released");

        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(source)) => Err(Error::Release(source)),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                tracing::warn!(
                    database = %database,
                    error = %close_err,
                    "failed to close administrative connection after error"
                );
                Err(err)
            }
        }
    }
}
