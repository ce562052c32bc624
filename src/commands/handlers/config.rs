use crate::commands::registry::CommandInvocation;
use crate::commands::CommandResult;
use crate::core::app::App;
use crate::core::config::data::path_display;

use super::required_args;

pub(crate) fn handle_system(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    match invocation.args {
        "" if app.session.system_prompt.is_empty() => {
            CommandResult::Output("No system prompt set.".to_string())
        }
        "" => CommandResult::Output(format!("System prompt: {}", app.session.system_prompt)),
        "-" => {
            app.set_system_prompt("");
            CommandResult::Output("System prompt cleared.".to_string())
        }
        prompt => {
            app.set_system_prompt(prompt);
            CommandResult::Output("System prompt updated.".to_string())
        }
    }
}

pub(crate) fn handle_key(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let key = match required_args(&invocation, "/key <api-key>") {
        Ok(key) => key,
        Err(result) => return result,
    };
    match app.set_api_key(key) {
        Ok(()) => CommandResult::Output("API key saved.".to_string()),
        Err(err) => CommandResult::Output(format!("API key set for this session only: {err}")),
    }
}

pub(crate) fn handle_forget(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let Some(model_id) = invocation.arg(0) else {
        return super::usage("/forget <id>");
    };
    match app.forget_model(model_id) {
        Ok(true) => CommandResult::Output(format!("Removed {model_id} from the saved catalog.")),
        Ok(false) => CommandResult::Output(format!("{model_id} is not in the saved catalog.")),
        Err(err) => CommandResult::Output(err.to_string()),
    }
}

pub(crate) fn handle_reset_config(
    app: &mut App,
    _invocation: CommandInvocation<'_>,
) -> CommandResult {
    let path = path_display(&app.paths().config_file);
    match app.reset_config() {
        Ok(true) => CommandResult::Output(format!("Deleted {path}.")),
        Ok(false) => CommandResult::Output(format!("No config at {path}.")),
        Err(err) => CommandResult::Output(err.to_string()),
    }
}
