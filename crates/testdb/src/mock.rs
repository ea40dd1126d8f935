//! In-memory administrative connector for unit tests.
//!
//! Records every connect, statement and close into a shared log, prefixed
//! with the connection number, and fails configured statements with a
//! given SQLSTATE.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use sqlx::error::{DatabaseError, ErrorKind};
use testdb_url::DbUrl;

use crate::admin::{AdminConnection, AdminConnector};

#[derive(Debug, Default)]
struct MockState {
    log: Vec<String>,
    failures: HashMap<String, &'static str>,
    fail_connect: bool,
    fail_close: bool,
    connections: usize,
}

/// Connector whose connections only record what they are asked to do.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make every execution of `statement` fail with `sqlstate`.
    pub(crate) fn fail_statement(&self, statement: impl Into<String>, sqlstate: &'static str) {
        self.state.lock().failures.insert(statement.into(), sqlstate);
    }

    pub(crate) fn fail_connect(&self) {
        self.state.lock().fail_connect = true;
    }

    pub(crate) fn fail_close(&self) {
        self.state.lock().fail_close = true;
    }

    pub(crate) fn log(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }
}

impl AdminConnector for MockConnector {
    type Connection = MockConnection;

    async fn connect(&self, url: &DbUrl) -> Result<MockConnection, sqlx::Error> {
        let mut state = self.state.lock();
        state.log.push(format!("connect {}", url.database()));
        if state.fail_connect {
            return Err(sqlx::Error::PoolTimedOut);
        }
        state.connections += 1;

        Ok(MockConnection {
            id: state.connections,
            state: Arc::clone(&self.state),
        })
    }
}

#[derive(Debug)]
pub(crate) struct MockConnection {
    id: usize,
    state: Arc<Mutex<MockState>>,
}

impl AdminConnection for MockConnection {
    async fn execute(&mut self, statement: &str) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock();
        state.log.push(format!("#{} {statement}", self.id));
        match state.failures.get(statement) {
            Some(&code) => Err(db_error(code)),
            None => Ok(()),
        }
    }

    async fn close(self) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock();
        state.log.push(format!("#{} close", self.id));
        if state.fail_close {
            return Err(sqlx::Error::Io(std::io::Error::other("close failed")));
        }
        Ok(())
    }
}

/// A server error carrying only a SQLSTATE.
#[derive(Debug)]
pub(crate) struct FakeDbError {
    code: &'static str,
    message: String,
}

impl fmt::Display for FakeDbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FakeDbError {}

impl DatabaseError for FakeDbError {
    fn message(&self) -> &str {
        &self.message
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.code))
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Build a driver error as the server would report it for `code`.
pub(crate) fn db_error(code: &'static str) -> sqlx::Error {
    sqlx::Error::Database(Box::new(FakeDbError {
        code,
        message: format!("mock server error {code}"),
    }))
}

/// Route log output through the test harness. Safe to call repeatedly.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
