//! Tracing and logging support.
//!
//! Diagnostics go to stderr so command output on stdout stays machine-readable.
//! Plugin processes inherit `CLOUDCTL_LOG`, and their stderr lines are
//! re-emitted here under the `cloudctl::plugin` target.

use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter variable read before `RUST_LOG`
pub const LOG_ENV: &str = "CLOUDCTL_LOG";

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable multi-line format.
    Pretty,

    /// Single-line format (default for the CLI).
    Compact,

    /// JSON format, one object per event.
    Json,
}

impl FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(TracingFormat::Pretty),
            "compact" => Ok(TracingFormat::Compact),
            "json" => Ok(TracingFormat::Json),
            other => Err(format!(
                "unknown log format '{}' (expected pretty, compact or json)",
                other
            )),
        }
    }
}

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter.
    ///
    /// If None, uses `CLOUDCTL_LOG`, then `RUST_LOG`, then "warn".
    pub level: Option<tracing::Level>,

    pub format: TracingFormat,

    /// Include timestamps in output.
    pub timestamps: bool,

    /// Include target module names in output.
    pub target: bool,

    /// Include thread IDs in output.
    pub thread_ids: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: TracingFormat::Compact,
            timestamps: true,
            target: true,
            thread_ids: false,
        }
    }
}

fn env_filter(level: Option<tracing::Level>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn")),
    }
}

/// Initialize the subscriber with default settings.
///
/// # Environment Variables
///
/// - `CLOUDCTL_LOG=debug` - Enable debug logs, including plugin stderr
/// - `CLOUDCTL_LOG=cloudctl_plugin_host=trace` - Per-module filtering
/// - `RUST_LOG` - Used when `CLOUDCTL_LOG` is unset
pub fn init_subscriber() {
    init_subscriber_with_config(TracingConfig::default());
}

/// Initialize the subscriber with custom configuration.
///
/// A second initialization in the same process is ignored.
pub fn init_subscriber_with_config(config: TracingConfig) {
    let filter = env_filter(config.level);
    let registry = tracing_subscriber::registry().with(filter);
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.target)
        .with_thread_ids(config.thread_ids);

    let result = match (config.format, config.timestamps) {
        (TracingFormat::Pretty, true) => registry.with(layer.pretty()).try_init(),
        (TracingFormat::Pretty, false) => registry.with(layer.pretty().without_time()).try_init(),
        (TracingFormat::Compact, true) => registry.with(layer.compact()).try_init(),
        (TracingFormat::Compact, false) => {
            registry.with(layer.compact().without_time()).try_init()
        }
        (TracingFormat::Json, true) => registry.with(layer.json()).try_init(),
        (TracingFormat::Json, false) => registry.with(layer.json().without_time()).try_init(),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.format, TracingFormat::Compact);
        assert!(config.timestamps);
        assert!(config.target);
        assert!(!config.thread_ids);
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("JSON".parse::<TracingFormat>(), Ok(TracingFormat::Json));
        assert_eq!("pretty".parse::<TracingFormat>(), Ok(TracingFormat::Pretty));
        assert!("xml".parse::<TracingFormat>().is_err());
    }
}
