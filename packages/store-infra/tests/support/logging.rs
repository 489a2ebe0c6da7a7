//! Logging for the store-infra integration tests.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Idempotent; every test calls it first.
///
/// Reads `TEST_LOG`, then `RUST_LOG`, then falls back to `"warn"`. The
/// `bootstrap=`, `probe=` and `reconcile=` markers show up at `info`:
///
/// ```bash
/// TEST_LOG=store_infra=info cargo test -p store-infra --test adapter_fallback
/// ```
pub fn init() {
    INITIALIZED.get_or_init(|| {
        let filter = std::env::var("TEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .map(EnvFilter::new)
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .without_time()
            .with_target(true)
            .try_init()
            .ok();
    });
}
