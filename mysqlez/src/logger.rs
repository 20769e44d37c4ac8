//! Tracing setup for applications and tests.
//!
//! The crate itself only emits `tracing` events (target `mysqlez`). This
//! helper installs a formatting subscriber and forwards `log` records, which
//! `sqlx` uses for statement logging, into it.

use tracing_subscriber::EnvFilter;

/// Installs a global `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (for example `"mysqlez=info"`) when it is unset or
/// invalid.
///
/// Returns `false` if a subscriber or `log` logger was already installed;
/// calling it more than once is harmless.
#[must_use]
pub fn init_tracing(default_directive: &str) -> bool {
    let bridged = tracing_log::LogTracer::init().is_ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok();

    bridged && installed
}
