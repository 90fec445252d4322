//! Logging for plugin processes
//!
//! stdout carries the wire protocol, so everything goes to stderr, which
//! the host forwards into its own log.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter variable shared with the host (falls back to `RUST_LOG`)
pub const LOG_ENV: &str = "CLOUDCTL_LOG";

/// Install a compact stderr subscriber. Safe to call more than once.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(false)
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
