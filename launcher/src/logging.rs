//! Tracing setup for hosts embedding the launcher.
//!
//! The launcher itself only emits `tracing` events; installing a subscriber
//! is left to the host, which may call [`init`].

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::io::env::Environment;

/// Set to any non-empty value to default to `debug` output.
pub const TEST_LOG_VERBOSE: &str = "TEST_LOG_VERBOSE";

/// Default directive when `RUST_LOG` is unset.
pub fn default_directive(env: &Environment) -> &'static str {
    if env.is_set(TEST_LOG_VERBOSE) {
        "debug"
    } else {
        "info"
    }
}

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; defaults to `info`, or `debug` with `TEST_LOG_VERBOSE`.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=launcher=debug my-test-host
/// ```
pub fn init() {
    let default = default_directive(&Environment::from_process());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
