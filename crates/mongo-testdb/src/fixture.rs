//! The `TestDb` fixture.

use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database, IndexModel};

use crate::config::{EnvOverrides, FixtureConfig};
use crate::error::{FixtureError, FixtureResult};
use crate::naming::random_collection_name;

/// Pass to [`TestDb::create_random_collection`] for a collection without indexes.
pub const NO_INDEXES: Vec<IndexModel> = Vec::new();

/// Client-side deadline for the `create` command.
const CREATE_COLLECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Client-side deadline for building all requested indexes.
const CREATE_INDEXES_TIMEOUT: Duration = Duration::from_secs(10);

/// Client-side deadline for dropping a collection after a failed setup.
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Server-side `maxTimeMS` applied to each index build.
const INDEX_MAX_TIME: Duration = Duration::from_secs(2);

/// A `MongoDB` database used for running tests against.
///
/// The fixture starts unconnected. Overrides may be applied until
/// [`TestDb::connect`] succeeds; after that the connection string and database
/// name are frozen until [`TestDb::close`].
///
/// A fixture is not meant to be mutated from several tests at once; collection
/// creation only needs `&self` and may run concurrently once connected.
#[derive(Debug)]
pub struct TestDb {
    url: String,
    database: String,
    connect_timeout: Duration,
    client: Option<Client>,
}

impl TestDb {
    /// Create an unconnected fixture. No I/O happens until [`TestDb::connect`].
    #[must_use]
    pub fn new(url: impl Into<String>, database: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            connect_timeout: timeout,
            client: None,
        }
    }

    /// Create an unconnected fixture from a [`FixtureConfig`].
    #[must_use]
    pub fn from_config(config: FixtureConfig) -> Self {
        Self::new(config.url, config.database, config.connect_timeout)
    }

    /// Connection string the fixture will use (or is using).
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Database that random collections are created in.
    #[must_use]
    pub fn database_name(&self) -> &str {
        &self.database
    }

    /// Timeout applied to the network dial and to server selection.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns `true` once [`TestDb::connect`] has succeeded and until [`TestDb::close`].
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Apply [`TEST_MONGO_URL`](crate::ENV_TEST_MONGO_URL) and
    /// [`TEST_MONGO_DB`](crate::ENV_TEST_MONGO_DB) from the process environment.
    ///
    /// Lets several people run the same suite against servers at different
    /// addresses or in different databases. Does nothing once connected.
    pub fn override_with_env_vars(&mut self) {
        self.override_from(&EnvOverrides::from_env());
    }

    /// Replace the connection string and/or database name with the values set in
    /// `overrides`. Ignored once connected.
    pub fn override_from(&mut self, overrides: &EnvOverrides) {
        if self.client.is_some() {
            tracing::debug!("test database already connected; ignoring overrides");
            return;
        }

        if let Some(url) = &overrides.url {
            tracing::debug!("overriding test database url from environment");
            self.url.clone_from(url);
        }
        if let Some(database) = &overrides.database {
            tracing::debug!(database = %database, "overriding test database name from environment");
            self.database.clone_from(database);
        }
    }

    /// Connect to the configured deployment.
    ///
    /// The connect timeout bounds both the TCP dial and server selection, and a
    /// `ping` is issued so an unreachable server is reported here rather than on
    /// the first collection operation.
    ///
    /// # Errors
    ///
    /// - [`FixtureError::AlreadyConnected`] if the fixture already holds a client.
    /// - [`FixtureError::Configuration`] if the URL cannot be parsed; no server is contacted.
    /// - [`FixtureError::Connection`] if no server answers within the timeout.
    pub async fn connect(&mut self) -> FixtureResult<()> {
        if self.client.is_some() {
            return Err(FixtureError::AlreadyConnected);
        }

        let mut options = ClientOptions::parse(self.url.as_str())
            .await
            .map_err(|source| FixtureError::Configuration { source })?;
        options.connect_timeout = Some(self.connect_timeout);
        options.server_selection_timeout = Some(self.connect_timeout);

        let client = Client::with_options(options)
            .map_err(|source| FixtureError::Configuration { source })?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| FixtureError::Connection { source })?;

        tracing::info!(database = %self.database, "connected test database");
        self.client = Some(client);
        Ok(())
    }

    /// Handle to the configured database.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::NotConnected`] before [`TestDb::connect`].
    pub fn database(&self) -> FixtureResult<Database> {
        self.client
            .as_ref()
            .map(|client| client.database(&self.database))
            .ok_or(FixtureError::NotConnected)
    }

    /// Create a collection named `test_` plus eight random letters and build the
    /// given indexes on it, in order.
    ///
    /// Collections are always randomly named because tests run concurrently and
    /// would otherwise interfere with each other. The caller owns the returned
    /// collection and should pass it to [`TestDb::drop_collection`] when done.
    ///
    /// # Errors
    ///
    /// - [`FixtureError::NotConnected`] before [`TestDb::connect`].
    /// - [`FixtureError::Database`] if creating the collection or any index fails.
    /// - [`FixtureError::Timeout`] if creating the collection or building its
    ///   indexes takes longer than ten seconds.
    ///
    /// When indexes fail or time out, or the create itself times out, the
    /// collection is dropped before the error is returned.
    pub async fn create_random_collection<T>(
        &self,
        indexes: Vec<IndexModel>,
    ) -> FixtureResult<Collection<T>>
    where
        T: Send + Sync,
    {
        let database = self.database()?;
        create_with_indexes(&database, indexes).await
    }

    /// Drop a collection previously returned by [`TestDb::create_random_collection`].
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Database`] if the server rejects the drop.
    pub async fn drop_collection<T>(&self, collection: &Collection<T>) -> FixtureResult<()>
    where
        T: Send + Sync,
    {
        collection
            .drop()
            .await
            .map_err(|source| FixtureError::Database {
                operation: "drop_collection",
                source,
            })?;
        tracing::debug!(collection = %collection.name(), "dropped test collection");
        Ok(())
    }

    /// Shut down the client and return the fixture to the unconnected state.
    ///
    /// Idempotent: closing an unconnected or already closed fixture does
    /// nothing. The shutdown is immediate, so operations still running on
    /// collections obtained from this fixture will fail.
    pub async fn close(&mut self) {
        if let Some(client) = self.client.take() {
            client.shutdown().immediate(true).await;
            tracing::info!(database = %self.database, "closed test database");
        }
    }
}

async fn create_with_indexes<T>(
    database: &Database,
    indexes: Vec<IndexModel>,
) -> FixtureResult<Collection<T>>
where
    T: Send + Sync,
{
    let name = random_collection_name();
    let collection = database.collection::<T>(&name);

    match tokio::time::timeout(CREATE_COLLECTION_TIMEOUT, database.create_collection(&name)).await
    {
        Ok(Ok(())) => {}
        Ok(Err(source)) => {
            return Err(FixtureError::Database {
                operation: "create_collection",
                source,
            });
        }
        Err(_) => {
            // The create may still have landed server-side.
            drop_after_failure(&collection).await;
            return Err(FixtureError::Timeout {
                operation: "create_collection",
                timeout: CREATE_COLLECTION_TIMEOUT,
            });
        }
    }

    run_or_cleanup(
        "create_index",
        CREATE_INDEXES_TIMEOUT,
        apply_indexes(&collection, indexes),
        drop_after_failure(&collection),
    )
    .await?;

    tracing::debug!(
        collection = %name,
        database = %database.name(),
        "created test collection"
    );
    Ok(collection)
}

async fn apply_indexes<T>(collection: &Collection<T>, indexes: Vec<IndexModel>) -> FixtureResult<()>
where
    T: Send + Sync,
{
    for index in indexes {
        collection
            .create_index(index)
            .max_time(INDEX_MAX_TIME)
            .await
            .map_err(|source| FixtureError::Database {
                operation: "create_index",
                source,
            })?;
    }
    Ok(())
}

/// Run `apply` under `deadline`. On error or timeout, run `cleanup` before
/// returning; the original failure is what the caller sees.
async fn run_or_cleanup<A, C>(
    operation: &'static str,
    deadline: Duration,
    apply: A,
    cleanup: C,
) -> FixtureResult<()>
where
    A: Future<Output = FixtureResult<()>> + Send,
    C: Future<Output = ()> + Send,
{
    let outcome = tokio::time::timeout(deadline, apply)
        .await
        .unwrap_or(Err(FixtureError::Timeout {
            operation,
            timeout: deadline,
        }));
    if outcome.is_err() {
        cleanup.await;
    }
    outcome
}

/// Best-effort drop of a half-configured collection. Failures are logged, not
/// returned, so the error that triggered the cleanup is preserved.
async fn drop_after_failure<T>(collection: &Collection<T>)
where
    T: Send + Sync,
{
    match tokio::time::timeout(CLEANUP_TIMEOUT, collection.drop()).await {
        Ok(Ok(())) => {
            tracing::debug!(
                collection = %collection.name(),
                "dropped collection after failed setup"
            );
        }
        Ok(Err(err)) => {
            tracing::warn!(
                collection = %collection.name(),
                error = %err,
                "failed to drop collection after failed setup"
            );
        }
        Err(_) => {
            tracing::warn!(
                collection = %collection.name(),
                timeout = ?CLEANUP_TIMEOUT,
                "timed out dropping collection after failed setup"
            );
        }
    }
}
