mod handlers;
mod registry;

pub use handlers::model::switch_note;
pub use registry::{all_commands, find_command, Command, CommandInvocation};

use crate::core::app::App;

pub enum CommandResult {
    Continue,
    /// Text to show the user.
    Output(String),
    /// The conversation was replaced; redraw it before showing the note.
    Reload(String),
    ProcessAsMessage(String),
    /// Needs the async catalog refresh, which the chat loop runs.
    RefreshModels,
    Quit,
}

pub fn process_input(app: &mut App, input: &str) -> CommandResult {
    let trimmed = input.trim();

    let Some(rest) = trimmed.strip_prefix('/') else {
        return CommandResult::ProcessAsMessage(input.to_string());
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command_name = match parts.next() {
        Some(name) if !name.is_empty() => name,
        _ => return CommandResult::ProcessAsMessage(input.to_string()),
    };
    let args = parts.next().unwrap_or("").trim();

    if let Some(command) = registry::find_command(command_name) {
        let invocation = CommandInvocation {
            input: trimmed,
            args,
        };
        (command.handler)(app, invocation)
    } else {
        CommandResult::Output(format!(
            "Unknown command /{command_name}. Type /help for the list."
        ))
    }
}

#[cfg(test)]
mod tests;
