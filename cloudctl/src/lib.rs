//! # cloudctl
//!
//! Command-line client for the cloud control plane. Domain commands (API keys,
//! Kafka clusters, service accounts, connectors) are served by plugin
//! executables that run as child processes; this crate holds the host side:
//! application state, the command tree, error reporting and exit codes.
//!
//! ## Command flow
//!
//! ```rust,ignore
//! use cloudctl::{CliResult, CommandRouter, Json, State};
//! use cloudctl_plugin_host::ServiceHandle;
//!
//! #[derive(Subcommand, CommandRouter)]
//! #[router(state = AppState)]
//! enum Commands {
//!     #[router(handler = commands::version::run)]
//!     Version,
//!
//!     // The apiKey plugin is launched right before the handler runs
//!     #[router(handler = commands::apikey::run, plugin = "apiKey")]
//!     ApiKey(ApiKeyArgs),
//! }
//!
//! async fn run(state: State<AppState>, plugin: ServiceHandle, args: ApiKeyArgs)
//!     -> CliResult<Json<ApiKey>> { /* ... */ }
//! ```

// Lets the derive macro name this crate as `cloudctl::` from inside it
extern crate self as cloudctl;

use cloudctl_plugin_api::{CallFailure, ConfigError, ErrorCode, ServiceError};
use cloudctl_plugin_host::{LaunchError, PluginManager, ServiceHandle};
use serde::Serialize;
use std::sync::Arc;

pub use cloudctl_macros::CommandRouter;

pub mod app;
pub mod build_info;
pub mod commands;
pub mod config;
pub mod tracing_support;

pub use app::AppState;
pub use build_info::{version_info, version_short};
pub use config::HostSettings;
pub use tracing_support::{
    init_subscriber, init_subscriber_with_config, TracingConfig, TracingFormat,
};

// ============================================================================
// Core Types
// ============================================================================

/// Shared application state wrapper.
///
/// Wraps the application state in an `Arc` so handlers can take it by value.
pub struct State<T>(Arc<T>);

// Manual impl so cloning never requires `T: Clone`
impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> State<T> {
    pub fn new(inner: T) -> Self {
        Self(Arc::new(inner))
    }

    pub fn get(&self) -> &T {
        &self.0
    }
}

/// CLI result type.
///
/// All handler functions return `CliResult<T>` where `T` implements `IntoResponse`.
pub type CliResult<T> = Result<T, CliError>;

/// State that can hand out plugin services.
///
/// Commands routed with `plugin = "..."` need their state to implement this.
pub trait PluginState {
    fn plugins(&self) -> &PluginManager;
}

/// Lazy-load the named plugin for a command about to run.
///
/// The first call for a name spawns the plugin; later calls reuse it.
pub async fn load_plugin<S: PluginState>(
    state: &State<S>,
    name: &str,
) -> CliResult<ServiceHandle> {
    tracing::debug!(plugin = name, "Loading plugin for command");
    Ok(state.get().plugins().get_or_launch_named(name).await?)
}

// ============================================================================
// Error Types
// ============================================================================

/// Top-level error type for CLI operations.
///
/// Distinguishes between user-fixable errors (exit code 1) and system failures (exit code 101).
#[derive(Debug)]
pub enum CliError {
    /// User-fixable errors (exit code 1); these carry actionable hints.
    User(UserError),

    /// Failures the user cannot fix from the command line (exit code 101).
    System(SystemError),
}

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::User(_) => 1,
            CliError::System(_) => 101,
        }
    }

    pub fn user(message: impl Into<String>) -> Self {
        CliError::User(UserError::Generic(message.into()))
    }

    pub fn system(message: impl Into<String>) -> Self {
        CliError::System(SystemError::Internal(message.into()))
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::User(e) => e.fmt(f),
            CliError::System(e) => e.fmt(f),
        }
    }
}

/// User-fixable errors (exit code 1).
#[derive(Debug)]
pub enum UserError {
    Generic(String),

    /// The plugin serving this command is not on the search path.
    PluginNotInstalled { plugin: String, binary: String },

    /// Prerequisite not met.
    PrerequisiteNotMet { check: String, fix_hint: String },

    /// The plugin refused the request.
    Rejected { code: ErrorCode, message: String },
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserError::Generic(msg) => write!(f, "Error: {}", msg),
            UserError::PluginNotInstalled { plugin, binary } => write!(
                f,
                "Error: The '{}' commands are unavailable: plugin '{}' is not installed\n\n\
                 Hint: Put '{}' in a directory listed in CLOUDCTL_PLUGIN_PATH or PATH",
                plugin, binary, binary
            ),
            UserError::PrerequisiteNotMet { check, fix_hint } => {
                write!(
                    f,
                    "Error: Prerequisite not met: {}\n\nHint: {}",
                    check, fix_hint
                )
            }
            UserError::Rejected { code, message } => write!(f, "Error: {}: {}", code, message),
        }
    }
}

/// System-level failures (exit code 101).
#[derive(Debug)]
pub enum SystemError {
    Internal(String),

    /// I/O error.
    Io(std::io::Error),

    /// Configuration file could not be read or parsed.
    ConfigParse(String),

    /// The plugin could not be started or does not speak our protocol.
    PluginIncompatible { plugin: String, reason: String },

    /// A call into a running plugin did not complete.
    PluginCall { kind: CallFailure, message: String },
}

impl std::fmt::Display for SystemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemError::Internal(msg) => {
                write!(f, "Internal Error: {}\n\nThis is likely a bug.", msg)
            }
            SystemError::Io(e) => {
                write!(f, "Internal Error: I/O operation failed\n\n{}", e)
            }
            SystemError::ConfigParse(e) => {
                write!(f, "Error: Configuration could not be loaded\n\n{}", e)
            }
            SystemError::PluginIncompatible { plugin, reason } => write!(
                f,
                "Error: Plugin '{}' is incompatible with this cloudctl\n\n{}\n\n\
                 Hint: Install the plugin release matching cloudctl {}",
                plugin,
                reason,
                version_short()
            ),
            SystemError::PluginCall { kind, message } => {
                write!(f, "Error: Plugin call failed ({})\n\n{}", kind, message)
            }
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::System(SystemError::Io(e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::System(SystemError::ConfigParse(e.to_string()))
    }
}

impl From<LaunchError> for CliError {
    fn from(e: LaunchError) -> Self {
        match e {
            LaunchError::NotInstalled { plugin, binary } => {
                CliError::User(UserError::PluginNotInstalled { plugin, binary })
            }
            LaunchError::HandshakeFailed { plugin, reason }
            | LaunchError::DispenseFailed { plugin, reason, .. } => {
                CliError::System(SystemError::PluginIncompatible { plugin, reason })
            }
            LaunchError::SpawnFailed {
                plugin,
                path,
                source,
            } => CliError::System(SystemError::PluginIncompatible {
                plugin,
                reason: format!("cannot execute {}: {}", path.display(), source),
            }),
            LaunchError::Registry(e) => CliError::system(e.to_string()),
        }
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Business(err) => match err.code {
                ErrorCode::Unauthorized => CliError::User(UserError::PrerequisiteNotMet {
                    check: err.message,
                    fix_hint: "Log in so the active context in config.json has valid credentials"
                        .to_string(),
                }),
                ErrorCode::Internal => CliError::system(err.message),
                code => CliError::User(UserError::Rejected {
                    code,
                    message: err.message,
                }),
            },
            ServiceError::RemoteCallFailed { kind, message } => {
                CliError::System(SystemError::PluginCall { kind, message })
            }
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Response returned by handlers after execution.
pub struct Response {
    /// Exit code (0 = success, 1 = user error, 101 = system error).
    pub exit_code: i32,

    pub output: Output,
}

impl Response {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: Output::Text(content.into()),
        }
    }

    pub fn json(content: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: Output::Json(content.into()),
        }
    }

    pub fn silent() -> Self {
        Self {
            exit_code: 0,
            output: Output::Silent,
        }
    }

    pub fn error(exit_code: i32, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: Output::Error(message.into()),
        }
    }
}

/// Output type for responses.
#[derive(Debug)]
pub enum Output {
    Silent,

    /// Text output (printed to stdout).
    Text(String),

    /// JSON output (printed to stdout).
    Json(String),

    /// Error report (printed to stderr).
    Error(String),
}

impl Output {
    pub fn is_empty(&self) -> bool {
        matches!(self, Output::Silent)
    }
}

impl std::fmt::Display for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Output::Silent => Ok(()),
            Output::Text(s) | Output::Json(s) | Output::Error(s) => write!(f, "{}", s),
        }
    }
}

/// Handler return value rendered as pretty-printed JSON
#[derive(Debug)]
pub struct Json<T>(pub T);

// ============================================================================
// Response Conversion Trait
// ============================================================================

/// Trait for converting handler return values into responses.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        Response::silent()
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_string_pretty(&self.0) {
            Ok(body) => Response::json(body),
            Err(e) => CliError::system(format!("Failed to render output: {}", e)).into_response(),
        }
    }
}

impl IntoResponse for CliError {
    fn into_response(self) -> Response {
        Response::error(self.exit_code(), self.to_string())
    }
}

impl<T: IntoResponse> IntoResponse for CliResult<T> {
    fn into_response(self) -> Response {
        match self {
            Ok(value) => value.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
