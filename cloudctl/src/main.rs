use clap::Parser;
use cloudctl::commands::Cli;
use cloudctl::{
    init_subscriber_with_config, AppState, CliError, HostSettings, Output, Response, State,
    TracingConfig,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut settings = match HostSettings::load() {
        Ok(settings) => settings,
        Err(e) => {
            let err = CliError::from(e);
            eprintln!("{}", err);
            std::process::exit(err.exit_code());
        }
    };
    if let Some(format) = cli.log_format {
        settings.log_format = format;
    }

    init_subscriber_with_config(TracingConfig {
        level: cli.log_level(),
        format: settings.log_format,
        ..Default::default()
    });
    settings.report_warnings();

    let state = State::new(AppState::new(settings));
    let hook = state.get().lifecycle_hook();

    let response = tokio::select! {
        response = cli.command.execute(state) => response,
        _ = tokio::signal::ctrl_c() => Response::error(130, "Interrupted"),
    };

    // Plugins must not outlive the host, whatever the command's outcome
    let stopped = hook.run().await;
    tracing::debug!(stopped, "Plugin processes stopped");

    match response.output {
        Output::Silent => {}
        Output::Text(text) | Output::Json(text) => println!("{}", text),
        Output::Error(message) => eprintln!("{}", message),
    }
    std::process::exit(response.exit_code);
}
