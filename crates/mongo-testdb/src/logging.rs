//! Tracing subscriber for test binaries.

use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when neither `TEST_LOG` nor `RUST_LOG` is set.
const DEFAULT_TEST_LOG_LEVEL: &str = "warn";

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Install a `fmt` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything, and an
/// already installed global subscriber is left alone. The filter is taken from
/// `TEST_LOG`, then `RUST_LOG`, then defaults to `warn`.
pub fn init_test_logging() {
    INITIALIZED.get_or_init(|| {
        let filter = resolve_filter(|key| std::env::var(key).ok());
        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .without_time()
            .try_init()
            .ok();
    });
}

fn resolve_filter<F>(lookup: F) -> EnvFilter
where
    F: Fn(&str) -> Option<String>,
{
    let directive = lookup("TEST_LOG")
        .or_else(|| lookup("RUST_LOG"))
        .unwrap_or_else(|| DEFAULT_TEST_LOG_LEVEL.to_string());
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_TEST_LOG_LEVEL))
}
