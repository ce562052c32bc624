use crate::commands::registry::CommandInvocation;
use crate::commands::CommandResult;
use crate::core::app::App;

use super::required_args;

pub(crate) fn handle_new(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.new_chat();
    CommandResult::Reload("Started a new chat.".to_string())
}

pub(crate) fn handle_history(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    let sessions = app.history();
    if sessions.is_empty() {
        return CommandResult::Output("No chat history available.".to_string());
    }
    let mut listing = String::from("Saved chats (newest first):\n");
    for summary in sessions {
        listing.push_str(&format!("  {summary}\n"));
    }
    listing.push_str("Use /load <id> to continue one.");
    CommandResult::Output(listing)
}

pub(crate) fn handle_load(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let id = match required_args(&invocation, "/load <id>") {
        Ok(id) => id,
        Err(result) => return result,
    };
    match app.load_chat(id) {
        Ok(count) => CommandResult::Reload(format!("Loaded {id} ({count} messages).")),
        Err(err) => CommandResult::Output(err.to_string()),
    }
}

pub(crate) fn handle_delete(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let id = match required_args(&invocation, "/delete <id>") {
        Ok(id) => id,
        Err(result) => return result,
    };
    match app.delete_chat(id) {
        Ok(()) => CommandResult::Output(format!("Deleted {id}.")),
        Err(err) => CommandResult::Output(err.to_string()),
    }
}

pub(crate) fn handle_clear_history(
    app: &mut App,
    _invocation: CommandInvocation<'_>,
) -> CommandResult {
    match app.clear_history() {
        Ok(removed) => CommandResult::Reload(format!("Removed {removed} saved chats.")),
        Err(err) => CommandResult::Output(err.to_string()),
    }
}
