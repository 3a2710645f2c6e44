//! `tracing` output for tests.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install a test-writer `fmt` subscriber once per process.
///
/// The filter comes from `RUST_LOG`, defaulting to `debug` for the ioutil
/// crates. Output is captured by the test harness unless `--nocapture`.
pub fn init_test_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("ioutil_scheduler=debug"));
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_names(true)
            .try_init();
        if installed.is_err() {
            tracing::debug!("a global tracing subscriber was already installed");
        }
    });
}
