//! Host settings derived from `config.json` and the environment

use crate::tracing_support::TracingFormat;
use cloudctl_plugin_api::{CliConfig, ConfigError};
use cloudctl_plugin_host::{
    LauncherConfig, SearchPath, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_SHUTDOWN_GRACE,
};
use std::time::Duration;

/// Deadline applied to every plugin call unless configured otherwise
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct HostSettings {
    pub search_path: SearchPath,
    pub handshake_timeout: Duration,
    pub call_timeout: Duration,
    pub shutdown_grace: Duration,
    pub log_format: TracingFormat,
    /// Problems found in `config.json`, reported once logging is up
    pub warnings: Vec<String>,
}

impl HostSettings {
    /// Read `config.json` from the configuration directory
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self::from_config(&CliConfig::load()?))
    }

    pub fn from_config(config: &CliConfig) -> Self {
        let mut warnings = Vec::new();
        let log_format = match config.log_format.as_deref().map(str::parse::<TracingFormat>) {
            Some(Ok(format)) => format,
            Some(Err(reason)) => {
                warnings.push(format!("Ignoring log_format in config.json: {}", reason));
                TracingFormat::Compact
            }
            None => TracingFormat::Compact,
        };

        Self {
            search_path: SearchPath::from_env(&config.plugin_path),
            handshake_timeout: millis_or(config.handshake_timeout_ms, DEFAULT_HANDSHAKE_TIMEOUT),
            call_timeout: millis_or(config.call_timeout_ms, DEFAULT_CALL_TIMEOUT),
            shutdown_grace: millis_or(config.shutdown_grace_ms, DEFAULT_SHUTDOWN_GRACE),
            log_format,
            warnings,
        }
    }

    /// Emit the warnings collected while reading `config.json`
    pub fn report_warnings(&self) {
        for warning in &self.warnings {
            tracing::warn!("{}", warning);
        }
    }

    pub fn launcher_config(&self) -> LauncherConfig {
        LauncherConfig::default()
            .with_search_path(self.search_path.clone())
            .with_handshake_timeout(self.handshake_timeout)
    }
}

impl Default for HostSettings {
    fn default() -> Self {
        Self::from_config(&CliConfig::default())
    }
}

fn millis_or(ms: Option<u64>, default: Duration) -> Duration {
    ms.map(Duration::from_millis).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_defaults() {
        let settings = HostSettings::default();
        assert_eq!(settings.handshake_timeout, DEFAULT_HANDSHAKE_TIMEOUT);
        assert_eq!(settings.call_timeout, DEFAULT_CALL_TIMEOUT);
        assert_eq!(settings.shutdown_grace, DEFAULT_SHUTDOWN_GRACE);
        assert_eq!(settings.log_format, TracingFormat::Compact);
        assert!(settings.warnings.is_empty());
    }

    #[test]
    fn test_config_overrides() {
        let config = CliConfig {
            plugin_path: vec![PathBuf::from("/opt/cloudctl/plugins")],
            handshake_timeout_ms: Some(1500),
            call_timeout_ms: Some(250),
            shutdown_grace_ms: Some(100),
            log_format: Some("json".to_string()),
            ..Default::default()
        };
        let settings = HostSettings::from_config(&config);

        assert_eq!(settings.handshake_timeout, Duration::from_millis(1500));
        assert_eq!(settings.call_timeout, Duration::from_millis(250));
        assert_eq!(settings.shutdown_grace, Duration::from_millis(100));
        assert_eq!(settings.log_format, TracingFormat::Json);
        assert!(settings
            .search_path
            .dirs()
            .contains(&PathBuf::from("/opt/cloudctl/plugins")));
        assert_eq!(
            settings.launcher_config().handshake_timeout,
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_bad_log_format_falls_back() {
        let config = CliConfig {
            log_format: Some("xml".to_string()),
            ..Default::default()
        };
        let settings = HostSettings::from_config(&config);
        assert_eq!(settings.log_format, TracingFormat::Compact);
        assert_eq!(settings.warnings.len(), 1);
        assert!(settings.warnings[0].contains("unknown log format 'xml'"));
    }
}
