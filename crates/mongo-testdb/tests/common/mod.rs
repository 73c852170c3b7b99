//! Resolves a live `MongoDB` server for integration tests.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use mongo_testdb::config::DEFAULT_DATABASE;
use mongo_testdb::{EnvOverrides, TestDb};
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};

const MONGO_IMAGE: &str = "mongo";
const MONGO_TAG: &str = "7";
const MONGO_PORT: u16 = 27017;

/// Connect timeout used by the live-server suites.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(2);

/// A reachable server plus the container backing it, if one was started.
pub struct LiveServer {
    pub url: String,
    _container: Option<ContainerAsync<GenericImage>>,
}

/// Find a server to test against.
///
/// `TEST_MONGO_URL` wins when set. Otherwise a disposable `mongo` container is
/// started if a docker daemon is reachable. Returns `Ok(None)` when neither is
/// available so callers can skip.
pub async fn live_server() -> Result<Option<LiveServer>> {
    mongo_testdb::logging::init_test_logging();

    if let Some(url) = EnvOverrides::from_env().url {
        return Ok(Some(LiveServer {
            url,
            _container: None,
        }));
    }

    if !docker_available() {
        return Ok(None);
    }

    let container = GenericImage::new(MONGO_IMAGE, MONGO_TAG)
        .with_exposed_port(ContainerPort::Tcp(MONGO_PORT))
        .with_wait_for(WaitFor::message_on_stdout("Waiting for connections"))
        .start()
        .await
        .context("failed to start mongo container")?;
    let port = container
        .get_host_port_ipv4(ContainerPort::Tcp(MONGO_PORT))
        .await
        .context("failed to resolve mongo host port")?;

    Ok(Some(LiveServer {
        url: format!("mongodb://127.0.0.1:{port}"),
        _container: Some(container),
    }))
}

impl LiveServer {
    /// An unconnected fixture pointed at this server.
    pub fn fixture(&self) -> TestDb {
        let database = EnvOverrides::from_env()
            .database
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        TestDb::new(self.url.clone(), database, TEST_TIMEOUT)
    }

    /// A connected fixture pointed at this server.
    pub async fn connected_fixture(&self) -> Result<TestDb> {
        let mut fixture = self.fixture();
        fixture
            .connect()
            .await
            .with_context(|| format!("failed to connect to {}", self.url))?;
        Ok(fixture)
    }
}

fn docker_available() -> bool {
    match std::env::var("DOCKER_HOST") {
        Ok(host) => host
            .strip_prefix("unix://")
            .is_none_or(|socket| Path::new(socket).exists()),
        Err(_) => Path::new("/var/run/docker.sock").exists(),
    }
}
