use std::path::Path;

use crate::commands::registry::CommandInvocation;
use crate::commands::{all_commands, CommandResult};
use crate::core::app::App;

use super::required_args;

pub(crate) fn handle_help(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    let width = all_commands()
        .iter()
        .map(|command| command.usage.len())
        .max()
        .unwrap_or(0);
    let mut help = String::from("Commands:\n");
    for command in all_commands() {
        help.push_str(&format!("  {:width$}  {}\n", command.usage, command.help));
    }
    help.push_str("Anything else is sent to the model.");
    CommandResult::Output(help)
}

pub(crate) fn handle_attach(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let path = match required_args(&invocation, "/attach <path>") {
        Ok(path) => path,
        Err(result) => return result,
    };
    match app.attach(Path::new(path)) {
        Ok(name) => CommandResult::Output(format!(
            "Attached {name} ({} pending). It will be sent with your next message.",
            app.session.attachments.len()
        )),
        Err(err) => CommandResult::Output(err.to_string()),
    }
}

pub(crate) fn handle_quit(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Quit
}
