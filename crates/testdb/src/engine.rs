//! Connection factory bound to the test database.
//!
//! The engine wraps a [`PgPool`] capped at a single connection. An idle
//! connection held by a larger pool would block `DROP DATABASE` at the end
//! of the session, so the cap is fixed rather than configurable. Every
//! connection starts with its session time zone set to UTC.

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Postgres;
use testdb_url::DbUrl;
use tracing::instrument;

use crate::admin::connect_options;
use crate::config::EngineConfig;
use crate::error::{Error, Result};

/// Session time zone for every engine connection.
pub const SESSION_TIME_ZONE: &str = "UTC";

/// Upper bound on live connections held by an engine.
pub const MAX_CONNECTIONS: u32 = 1;

/// A single-connection pool bound to the test database.
#[derive(Debug, Clone)]
pub struct Engine {
    pool: PgPool,
    url: DbUrl,
}

impl Engine {
    /// Build an engine for `url` without connecting.
    ///
    /// The first connection is opened on first use. An idle timeout needs a
    /// reaper task, so it is rejected with [`Error::Config`] when this is not
    /// polled inside a Tokio runtime.
    pub async fn connect_lazy(url: &DbUrl, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        if config.idle_timeout.is_some() && tokio::runtime::Handle::try_current().is_err() {
            return Err(Error::Config("idle_timeout requires a Tokio runtime".into()));
        }

        let mut options = connect_options(url)
            .map_err(|source| Error::Connect {
                url: url.redacted(),
                source,
            })?
            .options([("TimeZone", SESSION_TIME_ZONE)]);
        if let Some(name) = &config.application_name {
            options = options.application_name(name);
        }

        // Without an idle timeout the pool spawns no background maintenance
        // and holds nothing until first use.
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .min_connections(0)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(None)
            .test_before_acquire(config.test_before_acquire)
            .connect_lazy_with(options);

        tracing::debug!(database = url.database(), "test engine created");

        Ok(Self {
            pool,
            url: url.clone(),
        })
    }

    /// URL this engine connects to.
    #[must_use]
    pub fn url(&self) -> &DbUrl {
        &self.url
    }

    /// Name of the database this engine connects to.
    #[must_use]
    pub fn database_name(&self) -> &str {
        self.url.database()
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check out the engine's connection, waiting up to the acquire timeout
    /// if it is in use.
    #[instrument(skip(self), fields(database = %self.url.database()), err)]
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>> {
        self.pool.acquire().await.map_err(|source| Error::Connect {
            url: self.url.redacted(),
            source,
        })
    }

    /// Close the pool.
    ///
    /// Waits until a checked-out connection is returned, then closes it.
    /// Clones of this engine share the pool and are closed with it.
    pub async fn dispose(&self) {
        self.pool.close().await;
        tracing::debug!(database = self.url.database(), "test engine disposed");
    }

    /// Whether [`Engine::dispose`] has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.pool.is_closed()
    }
}

impl std::ops::Deref for Engine {
    type Target = PgPool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}
