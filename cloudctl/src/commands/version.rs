use crate::{version_info, AppState, CliResult, State};

pub async fn run(_state: State<AppState>) -> CliResult<String> {
    Ok(version_info())
}
