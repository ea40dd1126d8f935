//! Test database lifecycle.
//!
//! A [`TestingDb`] moves through three states, `uncreated`, `created` and
//! `dropped`, driven by [`TestingDb::create_database`] and
//! [`TestingDb::drop_database`]. The transitions are not guarded: calling
//! each once, in order, is the caller's responsibility. The session
//! fixtures in [`crate::session`] do exactly that.

use testdb_url::{DbUrl, IntoDbUrl};
use tracing::instrument;

use crate::admin::{AdminConnector, AdminScope, PgAdminConnector};
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::{self, Error, Result};
use crate::sql;

/// Lifecycle handle for one session's test database.
///
/// Holds the base URL, the derived test URL and the `drop_existing` policy.
/// All administrative statements run over a fresh connection to the base
/// database, opened through the connector `C`.
#[derive(Debug, Clone)]
pub struct TestingDb<C = PgAdminConnector> {
    base_url: DbUrl,
    url: DbUrl,
    drop_existing: bool,
    connector: C,
}

impl TestingDb {
    /// Create a handle for the test database derived from `base_url`.
    ///
    /// Nothing is sent to the server until [`TestingDb::create_database`].
    pub fn new(base_url: impl IntoDbUrl, drop_existing: bool) -> Result<Self> {
        Self::with_connector(base_url, drop_existing, PgAdminConnector::new())
    }
}

impl<C: AdminConnector> TestingDb<C> {
    /// Create a handle that opens administrative connections through
    /// `connector`.
    pub fn with_connector(
        base_url: impl IntoDbUrl,
        drop_existing: bool,
        connector: C,
    ) -> Result<Self> {
        let base_url = base_url.into_db_url()?;
        let url = base_url.derive_test_url();
        sql::validate_database_name(url.database())?;

        Ok(Self {
            base_url,
            url,
            drop_existing,
            connector,
        })
    }

    /// URL of the administrative database.
    #[must_use]
    pub fn base_url(&self) -> &DbUrl {
        &self.base_url
    }

    /// URL of the test database.
    #[must_use]
    pub fn url(&self) -> &DbUrl {
        &self.url
    }

    /// Name of the test database.
    #[must_use]
    pub fn database_name(&self) -> &str {
        self.url.database()
    }

    /// Whether a leftover test database is dropped before creation.
    #[must_use]
    pub fn drop_existing(&self) -> bool {
        self.drop_existing
    }

    /// Create the test database.
    ///
    /// With `drop_existing` set, a leftover database of the same name is
    /// dropped first over the same connection. A missing database is not
    /// an error at that point; any other failure is.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Statement`] if the database already exists and
    /// `drop_existing` is off ([`Error::is_database_exists`]).
    #[instrument(skip(self), fields(database = %self.url.database()), err)]
    pub async fn create_database(&self) -> Result<()> {
        let mut scope = AdminScope::open(&self.connector, &self.base_url).await?;
        let outcome = self.create_over(&mut scope).await;
        scope.release(outcome).await?;

        tracing::info!(database = %self.url.database(), "created test database");
        Ok(())
    }

    async fn create_over(&self, scope: &mut AdminScope<C::Connection>) -> Result<()> {
        let name = self.url.database();

        if self.drop_existing {
            let statement = sql::drop_database(name);
            match scope.execute(&statement).await {
                Ok(()) => {
                    tracing::info!(database = %name, "dropped leftover test database");
                }
                Err(err)
                    if error::sqlstate(&err).as_deref()
                        == Some(sql::SQLSTATE_INVALID_CATALOG_NAME) =>
                {
                    tracing::debug!(database = %name, "no leftover test database to drop");
                }
                Err(err) => return Err(Error::statement(statement, err)),
            }

            scope
                .execute(sql::ROLLBACK)
                .await
                .map_err(|err| Error::statement(sql::ROLLBACK, err))?;
        }

        let statement = sql::create_database(name);
        scope
            .execute(&statement)
            .await
            .map_err(|err| Error::statement(statement, err))
    }

    /// Drop the test database.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Statement`] if the database does not exist
    /// ([`Error::is_database_missing`]).
    #[instrument(skip(self), fields(database = %self.url.database()), err)]
    pub async fn drop_database(&self) -> Result<()> {
        let mut scope = AdminScope::open(&self.connector, &self.base_url).await?;

        let statement = sql::drop_database(self.url.database());
        let outcome = scope
            .execute(&statement)
            .await
            .map_err(|err| Error::statement(statement, err));
        scope.release(outcome).await?;

        tracing::info!(database = %self.url.database(), "dropped test database");
        Ok(())
    }

    /// Build an engine bound to the test database with default settings.
    pub async fn create_engine(&self) -> Result<Engine> {
        self.create_engine_with(&EngineConfig::default()).await
    }

    /// Build an engine bound to the test database.
    pub async fn create_engine_with(&self, config: &EngineConfig) -> Result<Engine> {
        Engine::connect_lazy(&self.url, config).await
    }
}
