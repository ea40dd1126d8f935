//! Test server fixture and catalog helpers.

use sqlx::{Connection, PgConnection};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, TestcontainersError};
use testdb::config::URL_ENV;
use testdb::{SessionConfig, sql};
use testdb_url::{DbUrl, UrlError};
use thiserror::Error;

use crate::container::{POSTGRES_PORT, PostgresContainer};

/// Errors raised while preparing or inspecting the test server.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The container could not be started or inspected.
    #[error("container error: {0}")]
    Container(#[from] TestcontainersError),

    /// The server URL is invalid.
    #[error("invalid server URL: {0}")]
    Url(#[from] UrlError),

    /// A catalog query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The testdb configuration was rejected.
    #[error("testdb error: {0}")]
    Testdb(#[from] testdb::Error),
}

/// A PostgreSQL server for integration tests.
///
/// Uses the server named by `TESTDB_URL` when set, otherwise starts a
/// container that lives as long as this value.
pub struct TestServer {
    base_url: DbUrl,
    container: Option<ContainerAsync<PostgresContainer>>,
}

impl TestServer {
    /// Connect to `TESTDB_URL` or start a container.
    pub async fn start() -> Result<Self, HarnessError> {
        if let Some(url) = std::env::var(URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
        {
            tracing::debug!("using server from {URL_ENV}");
            return Ok(Self {
                base_url: DbUrl::parse(&url)?,
                container: None,
            });
        }

        let container = PostgresContainer.start().await?;
        let host = container.get_host().await?;
        let port = container.get_host_port_ipv4(POSTGRES_PORT).await?;
        let base_url = DbUrl::parse(&PostgresContainer.base_url(&host.to_string(), port))?;

        tracing::debug!(port, "started PostgreSQL container");

        Ok(Self {
            base_url,
            container: Some(container),
        })
    }

    /// URL of the server's administrative database.
    #[must_use]
    pub fn base_url(&self) -> &DbUrl {
        &self.base_url
    }

    /// Whether this server runs in a container started by this fixture.
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.container.is_some()
    }

    /// Create `name` as a base database unless it exists and return its URL.
    ///
    /// Tests sharing a server use distinct base databases so their derived
    /// test databases do not collide.
    pub async fn base_database(&self, name: &str) -> Result<DbUrl, HarnessError> {
        if !self.database_exists(name).await? {
            self.execute_admin(&sql::create_database(name)).await?;
        }
        Ok(self.base_url.with_database(name))
    }

    /// Session configuration for the base database `name`.
    pub async fn session_config(&self, name: &str) -> Result<SessionConfig, HarnessError> {
        Ok(SessionConfig::new(self.base_database(name).await?)?)
    }

    /// Whether a database called `name` exists.
    pub async fn database_exists(&self, name: &str) -> Result<bool, HarnessError> {
        let mut conn = self.connect(&self.base_url).await?;
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)")
                .bind(name)
                .fetch_one(&mut conn)
                .await?;
        conn.close().await?;
        Ok(exists)
    }

    /// Names of all non-template databases, sorted.
    pub async fn list_databases(&self) -> Result<Vec<String>, HarnessError> {
        let mut conn = self.connect(&self.base_url).await?;
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT datname FROM pg_database WHERE NOT datistemplate ORDER BY datname",
        )
        .fetch_all(&mut conn)
        .await?;
        conn.close().await?;
        Ok(names)
    }

    /// Drop `name` if it exists, e.g. a test database left by an earlier run.
    pub async fn drop_database_if_exists(&self, name: &str) -> Result<(), HarnessError> {
        let statement = format!("DROP DATABASE IF EXISTS {}", sql::quote_identifier(name));
        self.execute_admin(&statement).await
    }

    /// Whether `table` exists in the `public` schema of the database at `url`.
    pub async fn table_exists(&self, url: &DbUrl, table: &str) -> Result<bool, HarnessError> {
        let mut conn = self.connect(url).await?;
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM pg_tables WHERE schemaname = 'public' AND tablename = $1)",
        )
        .bind(table)
        .fetch_one(&mut conn)
        .await?;
        conn.close().await?;
        Ok(exists)
    }

    /// Run `statement` against the database at `url`.
    pub async fn execute(&self, url: &DbUrl, statement: &str) -> Result<(), HarnessError> {
        let mut conn = self.connect(url).await?;
        sqlx::raw_sql(statement).execute(&mut conn).await?;
        conn.close().await?;
        Ok(())
    }

    async fn execute_admin(&self, statement: &str) -> Result<(), HarnessError> {
        self.execute(&self.base_url, statement).await
    }

    async fn connect(&self, url: &DbUrl) -> Result<PgConnection, HarnessError> {
        Ok(PgConnection::connect(&url.to_string()).await?)
    }
}

impl std::fmt::Debug for TestServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestServer")
            .field("base_url", &self.base_url)
            .field("container", &self.container.as_ref().map(|c| c.id().to_string()))
            .finish()
    }
}
