use std::net::TcpListener;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use mongo_testdb::{FixtureError, TestDb};

fn unused_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("failed to reserve port")?;
    let port = listener
        .local_addr()
        .context("failed to read listener address")?
        .port();
    drop(listener);
    Ok(port)
}

#[tokio::test]
async fn malformed_urls_fail_without_contacting_a_server() {
    for url in ["thisis?invalid", "jibberish:99999999999", "mongodb://"] {
        let mut fixture = TestDb::new(url, "test", Duration::from_secs(30));
        let started = Instant::now();
        let err = fixture
            .connect()
            .await
            .expect_err("malformed url must be rejected");
        assert!(
            matches!(err, FixtureError::Configuration { .. }),
            "{url}: unexpected error {err:?}"
        );
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!fixture.is_connected());
    }
}

#[tokio::test]
async fn unreachable_server_fails_after_the_timeout() -> Result<()> {
    mongo_testdb::logging::init_test_logging();
    let timeout = Duration::from_millis(300);
    let url = format!("mongodb://127.0.0.1:{}", unused_port()?);
    let mut fixture = TestDb::new(url, "test", timeout);

    let started = Instant::now();
    let err = fixture
        .connect()
        .await
        .expect_err("nothing listens on the reserved port");
    let elapsed = started.elapsed();

    assert!(matches!(err, FixtureError::Connection { .. }), "{err:?}");
    assert!(elapsed >= timeout / 2, "failed too quickly: {elapsed:?}");
    assert!(elapsed < timeout + Duration::from_secs(5), "took {elapsed:?}");
    assert!(!fixture.is_connected());
    Ok(())
}

#[tokio::test]
async fn failed_connect_can_be_retried_after_override() -> Result<()> {
    let url = format!("mongodb://127.0.0.1:{}", unused_port()?);
    let mut fixture = TestDb::new("thisis?invalid", "test", Duration::from_millis(200));
    assert!(fixture.connect().await.is_err());

    fixture.override_from(&mongo_testdb::EnvOverrides {
        url: Some(url.clone()),
        database: None,
    });
    assert_eq!(fixture.url(), url);

    let err = fixture
        .connect()
        .await
        .expect_err("nothing listens on the reserved port");
    assert!(matches!(err, FixtureError::Connection { .. }));
    Ok(())
}
