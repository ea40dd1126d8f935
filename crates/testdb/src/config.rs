//! Session and engine configuration.

use std::time::Duration;

use testdb_url::{DbUrl, IntoDbUrl};

use crate::error::{Error, Result};

/// Environment variable holding the base connection URL.
pub const URL_ENV: &str = "TESTDB_URL";

/// Environment variable enabling removal of a leftover test database.
pub const DROP_EXISTING_ENV: &str = "TESTDB_DROP_EXISTING";

/// Default application name reported by engine connections.
pub const DEFAULT_APPLICATION_NAME: &str = "testdb";

/// Configuration for the engine bound to the test database.
///
/// The engine never holds more than one connection; that limit is not
/// configurable. This struct is marked `#[non_exhaustive]`; use
/// [`EngineConfig::new`] and the builder methods.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct EngineConfig {
    /// Time to wait for the single connection before timing out.
    pub acquire_timeout: Duration,

    /// Time the connection can sit idle before being closed.
    ///
    /// `None` keeps it open until the engine is disposed.
    pub idle_timeout: Option<Duration>,

    /// Whether to ping the connection before handing it out.
    pub test_before_acquire: bool,

    /// Application name reported to the server.
    pub application_name: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: None,
            test_before_acquire: true,
            application_name: Some(DEFAULT_APPLICATION_NAME.to_string()),
        }
    }
}

impl EngineConfig {
    /// Create an engine configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the acquire timeout.
    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the idle timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Enable or disable the ping before acquire.
    #[must_use]
    pub fn test_before_acquire(mut self, enabled: bool) -> Self {
        self.test_before_acquire = enabled;
        self
    }

    /// Set the application name. `None` leaves it to the driver.
    #[must_use]
    pub fn application_name(mut self, name: Option<String>) -> Self {
        self.application_name = name;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.acquire_timeout.is_zero() {
            return Err(Error::Config(
                "acquire_timeout must be greater than 0".into(),
            ));
        }
        if self.idle_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(Error::Config("idle_timeout must be greater than 0".into()));
        }
        if self
            .application_name
            .as_deref()
            .is_some_and(|name| name.contains('\0'))
        {
            return Err(Error::Config(
                "application_name must not contain NUL".into(),
            ));
        }
        Ok(())
    }
}

/// Everything a test session needs to provision its database.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct SessionConfig {
    /// URL of the administrative database the test database is created from.
    pub base_url: DbUrl,

    /// Drop a leftover test database of the same name before creating.
    pub drop_existing: bool,

    /// Engine settings.
    pub engine: EngineConfig,
}

impl SessionConfig {
    /// Create a configuration for `base_url` with `drop_existing` off.
    pub fn new(base_url: impl IntoDbUrl) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into_db_url()?,
            drop_existing: false,
            engine: EngineConfig::default(),
        })
    }

    /// Read the configuration from the process environment.
    ///
    /// `TESTDB_URL` is required. `TESTDB_DROP_EXISTING` is optional and
    /// defaults to `false`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(URL_ENV)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("{URL_ENV} is not set")))?;

        let drop_existing = match lookup(DROP_EXISTING_ENV) {
            Some(value) => parse_flag(DROP_EXISTING_ENV, &value)?,
            None => false,
        };

        Ok(Self::new(url)?.drop_existing(drop_existing))
    }

    /// Set whether a leftover test database is dropped before creation.
    #[must_use]
    pub fn drop_existing(mut self, enabled: bool) -> Self {
        self.drop_existing = enabled;
        self
    }

    /// Set the engine configuration.
    #[must_use]
    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }
}

/// Parse a boolean flag value. An empty value counts as `false`.
pub(crate) fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!(
            "{name} must be a boolean, got `{other}`"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_engine_config() {
        let config = EngineConfig::default();
        assert_eq!(config.acquire_timeout, Duration::from_secs(30));
        assert_eq!(config.idle_timeout, None);
        assert!(config.test_before_acquire);
        assert_eq!(config.application_name.as_deref(), Some("testdb"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_engine_config_builder_methods() {
        let config = EngineConfig::new()
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Some(Duration::from_secs(60)))
            .test_before_acquire(false)
            .application_name(None);

        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(60)));
        assert!(!config.test_before_acquire);
        assert_eq!(config.application_name, None);
    }

    #[test]
    fn test_engine_config_validation_zero_timeouts() {
        let config = EngineConfig::new().acquire_timeout(Duration::ZERO);
        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("acquire_timeout must be greater than 0")
        );

        let config = EngineConfig::new().idle_timeout(Some(Duration::ZERO));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_config_new() {
        let config = SessionConfig::new("postgresql://user@host/appdb").unwrap();
        assert_eq!(config.base_url.database(), "appdb");
        assert!(!config.drop_existing);

        let config = config.drop_existing(true);
        assert!(config.drop_existing);
    }

    #[test]
    fn test_session_config_rejects_bad_url() {
        let err = SessionConfig::new("postgresql://user@host").unwrap_err();
        assert!(matches!(err, Error::Url(_)));
    }

    #[test]
    fn test_from_lookup_defaults_drop_existing_to_false() {
        let config =
            SessionConfig::from_lookup(lookup(&[(URL_ENV, "postgresql://user@host/appdb")]))
                .unwrap();

        assert_eq!(config.base_url.to_string(), "postgresql://user@host/appdb");
        assert!(!config.drop_existing);
    }

    #[test]
    fn test_from_lookup_reads_drop_existing() {
        let config = SessionConfig::from_lookup(lookup(&[
            (URL_ENV, "postgresql://user@host/appdb"),
            (DROP_EXISTING_ENV, "Yes"),
        ]))
        .unwrap();

        assert!(config.drop_existing);
    }

    #[test]
    fn test_from_lookup_requires_url() {
        let err = SessionConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains(URL_ENV));

        let err = SessionConfig::from_lookup(lookup(&[(URL_ENV, "  ")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_lookup_rejects_bad_flag() {
        let err = SessionConfig::from_lookup(lookup(&[
            (URL_ENV, "postgresql://user@host/appdb"),
            (DROP_EXISTING_ENV, "maybe"),
        ]))
        .unwrap_err();

        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_parse_flag() {
        for value in ["1", "true", "TRUE", "yes", "on", " On "] {
            assert!(parse_flag("FLAG", value).unwrap(), "{value}");
        }
        for value in ["", "0", "false", "No", "off"] {
            assert!(!parse_flag("FLAG", value).unwrap(), "{value}");
        }
        assert!(parse_flag("FLAG", "2").is_err());
    }
}
