//! Session fixtures.
//!
//! A [`TestSession`] owns one session's test database and the engine bound
//! to it. [`TestSession::start`] creates the database before anything can
//! use it; [`TestSession::finish`] disposes the engine and drops the
//! database, and consumes the session so it can run at most once.
//!
//! [`run_session`] wraps both around an async body and runs the teardown
//! even if the body panics.
//!
//! ```rust,no_run
//! use testdb::{SessionConfig, run_session};
//!
//! # async fn example() -> testdb::Result<()> {
//! let config = SessionConfig::from_env()?;
//!
//! let count: i64 = run_session(&config, async |session| {
//!     sqlx::query_scalar("SELECT count(*) FROM pg_tables")
//!         .fetch_one(session.engine().pool())
//!         .await
//!         .unwrap_or_default()
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;

use crate::admin::{AdminConnector, PgAdminConnector};
use crate::config::SessionConfig;
use crate::engine::Engine;
use crate::error::Result;
use crate::lifecycle::TestingDb;

/// A live test session: a created test database and its engine.
pub struct TestSession<C: AdminConnector = PgAdminConnector> {
    db: TestingDb<C>,
    engine: Engine,
    finished: bool,
}

impl TestSession {
    /// Create the test database and build its engine.
    pub async fn start(config: &SessionConfig) -> Result<Self> {
        let connector =
            PgAdminConnector::new().application_name(config.engine.application_name.clone());
        Self::start_with(config, connector).await
    }
}

impl<C: AdminConnector> TestSession<C> {
    /// Like [`TestSession::start`], opening administrative connections
    /// through `connector`.
    ///
    /// If the engine cannot be built the database just created is dropped
    /// again before the error is returned.
    pub async fn start_with(config: &SessionConfig, connector: C) -> Result<Self> {
        config.engine.validate()?;

        let db = TestingDb::with_connector(&config.base_url, config.drop_existing, connector)?;
        db.create_database().await?;

        let engine = match db.create_engine_with(&config.engine).await {
            Ok(engine) => engine,
            Err(err) => {
                if let Err(drop_err) = db.drop_database().await {
                    tracing::warn!(
                        database = %db.database_name(),
                        error = %drop_err,
                        "failed to drop test database after engine setup failed"
                    );
                }
                return Err(err);
            }
        };

        tracing::info!(database = %db.database_name(), "test session started");

        Ok(Self {
            db,
            engine,
            finished: false,
        })
    }

    /// The lifecycle handle.
    #[must_use]
    pub fn testing_db(&self) -> &TestingDb<C> {
        &self.db
    }

    /// The engine bound to the test database.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Name of the test database.
    #[must_use]
    pub fn database_name(&self) -> &str {
        self.db.database_name()
    }

    /// Dispose the engine, then drop the test database.
    ///
    /// Disposal waits for a checked-out engine connection to come back, so
    /// no connection to the test database is open when it is dropped.
    pub async fn finish(mut self) -> Result<()> {
        self.finished = true;

        self.engine.dispose().await;
        self.db.drop_database().await?;

        tracing::info!(database = %self.db.database_name(), "test session finished");
        Ok(())
    }
}

impl<C: AdminConnector> Drop for TestSession<C> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(
                database = %self.db.database_name(),
                "test session dropped without finish; test database left on the server"
            );
        }
    }
}

impl<C: AdminConnector> std::fmt::Debug for TestSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestSession")
            .field("database", &self.db.database_name())
            .field("engine", &self.engine)
            .field("finished", &self.finished)
            .finish()
    }
}

/// Run `body` inside a test session.
///
/// The session is started first and finished after `body` returns or
/// panics. A panic is resumed once teardown is done; a teardown error
/// during a panic is logged.
pub async fn run_session<F, T>(config: &SessionConfig, body: F) -> Result<T>
where
    F: AsyncFnOnce(&TestSession) -> T,
{
    let session = TestSession::start(config).await?;
    finish_after(session, body).await
}

/// Like [`run_session`], opening administrative connections through
/// `connector`.
pub async fn run_session_with<C, F, T>(config: &SessionConfig, connector: C, body: F) -> Result<T>
where
    C: AdminConnector,
    F: AsyncFnOnce(&TestSession<C>) -> T,
{
    let session = TestSession::start_with(config, connector).await?;
    finish_after(session, body).await
}

async fn finish_after<C, F, T>(session: TestSession<C>, body: F) -> Result<T>
where
    C: AdminConnector,
    F: AsyncFnOnce(&TestSession<C>) -> T,
{
    let outcome = AssertUnwindSafe(body(&session)).catch_unwind().await;
    let finished = session.finish().await;

    match outcome {
        Ok(value) => finished.map(|()| value),
        Err(panic) => {
            if let Err(err) = finished {
                tracing::error!(error = %err, "test session teardown failed after panic");
            }
            std::panic::resume_unwind(panic)
        }
    }
}
