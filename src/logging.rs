//! Logging setup.
//!
//! The catalog logs through `tracing`: searches at `debug`, hit counts at
//! `info`, timeouts at `warn`. These helpers install a `tracing-subscriber`
//! writing to **stderr**, since a plugin host reads stdout.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log filter (e.g. `info`, `fabric_catalog=debug`)
//!
//! ```bash
//! # Show every compiled query
//! RUST_LOG=fabric_catalog=debug ./my-provider
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Target name of the crate's log events.
pub const LOG_TARGET: &str = "fabric_catalog";

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn subscriber(default_level: &str) -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry().with(env_filter(default_level)).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    )
}

/// Install the stderr subscriber, `info` unless `RUST_LOG` says otherwise.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Like [`init_logging`] with `default_level` used when `RUST_LOG` is unset.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
///
/// # Example
///
/// ```ignore
/// fabric_catalog::init_logging_with_default("fabric_catalog=debug");
/// ```
pub fn init_logging_with_default(default_level: &str) {
    subscriber(default_level).init();
}

/// Install the stderr subscriber unless one is already set.
///
/// Returns `false` when another subscriber was installed first, which
/// happens when several tests initialise logging.
pub fn try_init_logging() -> bool {
    subscriber("info").try_init().is_ok()
}
