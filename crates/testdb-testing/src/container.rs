//! PostgreSQL container support via testcontainers.

use testcontainers::Image;
use testcontainers::core::{ContainerPort, WaitFor};

/// Port PostgreSQL listens on inside the container.
pub const POSTGRES_PORT: u16 = 5432;

const READY_MESSAGE: &str = "database system is ready to accept connections";

/// Superuser created by the image; it may create and drop databases.
pub const SUPERUSER: &str = "postgres";

const SUPERUSER_PASSWORD: &str = "postgres";

/// Database created at startup; the base database for tests.
pub const BASE_DATABASE: &str = "appdb";

/// PostgreSQL container image, `postgres:16-alpine`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresContainer;

impl PostgresContainer {
    /// Base URL for a container reachable at `host:port`.
    #[must_use]
    pub fn base_url(&self, host: &str, port: u16) -> String {
        format!(
            "postgresql://{SUPERUSER}:{SUPERUSER_PASSWORD}@{host}:{port}/{BASE_DATABASE}?sslmode=disable"
        )
    }
}

impl Image for PostgresContainer {
    fn name(&self) -> &str {
        "postgres"
    }

    fn tag(&self) -> &str {
        "16-alpine"
    }

    fn ready_conditions(&self) -> Vec<WaitFor> {
        // The init script restarts the server; the stdout copy of the
        // message only appears after the restart.
        vec![
            WaitFor::message_on_stderr(READY_MESSAGE),
            WaitFor::message_on_stdout(READY_MESSAGE),
        ]
    }

    fn env_vars(
        &self,
    ) -> impl IntoIterator<
        Item = (
            impl Into<std::borrow::Cow<'_, str>>,
            impl Into<std::borrow::Cow<'_, str>>,
        ),
    > {
        [
            ("POSTGRES_USER", SUPERUSER),
            ("POSTGRES_PASSWORD", SUPERUSER_PASSWORD),
            ("POSTGRES_DB", BASE_DATABASE),
        ]
    }

    fn expose_ports(&self) -> &[ContainerPort] {
        &[ContainerPort::Tcp(POSTGRES_PORT)]
    }
}
