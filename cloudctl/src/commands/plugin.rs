use crate::{AppState, CliResult, IntoResponse, Json, PluginState, Response, State};
use clap::{Args, Subcommand};
use cloudctl_plugin_host::discover;

#[derive(Args, Debug)]
pub struct PluginArgs {
    #[command(subcommand)]
    pub action: PluginAction,
}

#[derive(Subcommand, Debug)]
pub enum PluginAction {
    /// Show where each plugin resolves on the search path
    List,

    /// Print the directories searched for plugins, in order
    Path,
}

pub async fn run(state: State<AppState>, args: PluginArgs) -> CliResult<Response> {
    let app = state.get();
    let search = &app.settings.search_path;

    Ok(match args.action {
        PluginAction::List => Json(discover(app.plugins().registry(), search)).into_response(),
        PluginAction::Path => search
            .dirs()
            .iter()
            .map(|dir| dir.display().to_string())
            .collect::<Vec<_>>()
            .join("\n")
            .into_response(),
    })
}
