//! Command tree
//!
//! Each domain command group is served by one plugin. The router launches
//! that plugin right before the handler runs, so `cloudctl version` or
//! `cloudctl plugin list` never spawn a child process.

use crate::{AppState, CliError, CliResult, CommandRouter, TracingFormat};
use anstyle::{AnsiColor, Style};
use clap::builder::Styles;
use clap::{Parser, Subcommand};
use cloudctl_plugin_host::ServiceHandle;

pub mod apikey;
pub mod connect;
pub mod kafka;
pub mod plugin;
pub mod service_account;
pub mod version;

#[derive(Parser, Debug)]
#[command(name = "cloudctl", version, about = "Manage cloud control plane resources")]
#[command(styles = styles(), propagate_version = true)]
pub struct Cli {
    /// Diagnostic log format on stderr
    #[arg(long, global = true, value_name = "FORMAT", value_parser = parse_format)]
    pub log_format: Option<TracingFormat>,

    /// Raise diagnostic verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn log_level(&self) -> Option<tracing::Level> {
        match self.verbose {
            0 => None,
            1 => Some(tracing::Level::INFO),
            2 => Some(tracing::Level::DEBUG),
            _ => Some(tracing::Level::TRACE),
        }
    }
}

#[derive(Subcommand, CommandRouter, Debug)]
#[router(state = AppState)]
pub enum Commands {
    /// Manage API keys
    #[command(name = "api-key")]
    #[router(handler = apikey::run, plugin = "apiKey")]
    ApiKey(apikey::ApiKeyArgs),

    /// Manage Kafka clusters
    #[router(handler = kafka::run, plugin = "confluent-kafka-plugin")]
    Kafka(kafka::KafkaArgs),

    /// Manage service accounts and look up users
    #[command(name = "service-account")]
    #[router(handler = service_account::run, plugin = "user")]
    ServiceAccount(service_account::ServiceAccountArgs),

    /// Manage connectors
    #[router(handler = connect::run, plugin = "confluent-connect-plugin")]
    Connect(connect::ConnectArgs),

    /// Inspect installed plugins
    #[router(handler = plugin::run)]
    Plugin(plugin::PluginArgs),

    /// Show build and protocol information
    #[router(handler = version::run)]
    Version,
}

fn parse_format(s: &str) -> Result<TracingFormat, String> {
    s.parse()
}

fn styles() -> Styles {
    let heading = Style::new().bold().fg_color(Some(AnsiColor::Cyan.into()));
    Styles::styled()
        .header(heading)
        .usage(heading)
        .literal(Style::new().bold())
        .placeholder(Style::new().italic())
        .error(Style::new().bold().fg_color(Some(AnsiColor::Red.into())))
}

/// Unwrap the service a plugin dispensed, or report that it dispensed another one
pub(crate) fn dispensed<T>(service: Option<T>, plugin: &ServiceHandle) -> CliResult<T> {
    service.ok_or_else(|| {
        CliError::system(format!(
            "plugin '{}' dispensed an unexpected service",
            plugin.descriptor().name
        ))
    })
}
