//! Process-wide JSON logging for the bridge binary.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Used when `RUST_LOG` is unset. Pool and driver chatter stays at `warn`; the
/// adapter's `bootstrap=`/`probe=`/`reconcile=` markers are at `info`.
const DEFAULT_FILTER: &str = "info,actix_web=info,sqlx=warn,sea_orm=warn,sea_orm_migration=warn";

pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false)
        .json()
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
