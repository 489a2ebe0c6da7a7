pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

#[cfg(test)]
pub mod test_bootstrap;

pub use error::AppError;
pub use state::AppState;

#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    test_bootstrap::logging::init();
}
