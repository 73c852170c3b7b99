//! Fixture settings and the environment variables that may override them.

use std::time::Duration;

/// Environment variable that overrides the connection string of a [`crate::TestDb`].
///
/// Only consulted when [`crate::TestDb::override_with_env_vars`] (or
/// [`crate::TestDb::override_from`]) is called before connecting.
pub const ENV_TEST_MONGO_URL: &str = "TEST_MONGO_URL";

/// Environment variable that overrides the database name of a [`crate::TestDb`].
pub const ENV_TEST_MONGO_DB: &str = "TEST_MONGO_DB";

/// Connection string used when nothing else is configured.
pub const DEFAULT_URL: &str = "mongodb://localhost:27017";

/// Database used when nothing else is configured.
pub const DEFAULT_DATABASE: &str = "mongo-testdb";

/// Connect and server-selection timeout used when nothing else is configured.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Settings a [`crate::TestDb`] is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureConfig {
    /// `MongoDB` connection string.
    pub url: String,
    /// Database that random collections are created in.
    pub database: String,
    /// Applied to both the network dial and server selection.
    pub connect_timeout: Duration,
}

impl FixtureConfig {
    /// Build a config from explicit values.
    #[must_use]
    pub fn new(url: impl Into<String>, database: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            connect_timeout: timeout,
        }
    }
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL, DEFAULT_DATABASE, DEFAULT_CONNECT_TIMEOUT)
    }
}

/// Snapshot of the override variables.
///
/// Taking the snapshot is separate from applying it so the override rules can
/// be exercised without touching the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// Replacement connection string, if set and non-empty.
    pub url: Option<String>,
    /// Replacement database name, if set and non-empty.
    pub database: Option<String>,
}

impl EnvOverrides {
    /// Read [`ENV_TEST_MONGO_URL`] and [`ENV_TEST_MONGO_DB`] from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a snapshot from an arbitrary key lookup. Empty values count as unset.
    #[must_use]
    pub fn from_lookup<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut read = |key: &str| lookup(key).filter(|value| !value.is_empty());
        Self {
            url: read(ENV_TEST_MONGO_URL),
            database: read(ENV_TEST_MONGO_DB),
        }
    }

    /// Returns `true` when neither variable carries a value.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.url.is_none() && self.database.is_none()
    }
}
