//! Shared helpers for `procrelay` integration tests.

pub mod builders;
pub mod recording_sink;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

pub use recording_sink::RecordingSink;

/// Upper bound for any single awaited run in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

static INIT: Once = Once::new();

/// Route `tracing` output through the test harness writer.
///
/// Output only shows for failing tests (or with `--nocapture`). The filter
/// comes from `RUST_LOG` and defaults to `info`, so run spans and the
/// "run succeeded"/"run failed" records are visible when a test breaks.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_TIMEOUT`].
///
/// A hung relay or a child that was never killed shows up as this panic
/// instead of a stuck test binary.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("test future did not finish within {TEST_TIMEOUT:?}"),
    }
}
