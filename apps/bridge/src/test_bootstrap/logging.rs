#![cfg(test)]

//! Test logging for the bridge's unit tests.
//!
//! Installed once per test binary by the `ctor` hook in `lib.rs`; tests never
//! need to call it themselves.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Install a test-writer subscriber, at most once.
///
/// Level precedence:
///
/// 1. `TEST_LOG` (preferred)
/// 2. `RUST_LOG`
/// 3. `"warn"`
///
/// ```bash
/// # show adapter transitions and probe outcomes while testing
/// TEST_LOG=store_infra=debug,bridge=info cargo test -p bridge
/// ```
///
/// Output goes through `with_test_writer()` so it is captured per test and
/// only shown for failures. `try_init().ok()` keeps a second subscriber (from
/// another harness) from panicking.
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
            .try_init()
            .ok();
    });
}
