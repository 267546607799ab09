//! Tracing subscriber installation.

use std::error::Error;

use tracing_subscriber::{EnvFilter, fmt};

/// Install a JSON subscriber filtered by `RUST_LOG`.
///
/// Fails instead of panicking when a global subscriber is already set, so
/// callers can log the error and carry on.
pub fn init_tracing() -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
}
