use super::handlers;
use super::CommandResult;
use crate::core::app::App;

pub type CommandHandler = fn(&mut App, CommandInvocation<'_>) -> CommandResult;

pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub handler: CommandHandler,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub input: &'a str,
    pub args: &'a str,
}

impl<'a> CommandInvocation<'a> {
    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.args.split_whitespace().nth(index)
    }
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        usage: "/help",
        help: "Show available commands.",
        handler: handlers::core::handle_help,
    },
    Command {
        name: "model",
        usage: "/model [id]",
        help: "Show the active model or switch to another one.",
        handler: handlers::model::handle_model,
    },
    Command {
        name: "models",
        usage: "/models",
        help: "List the model catalog, text models first.",
        handler: handlers::model::handle_models,
    },
    Command {
        name: "info",
        usage: "/info [id]",
        help: "Show pricing and validated configuration for a model.",
        handler: handlers::model::handle_info,
    },
    Command {
        name: "refresh",
        usage: "/refresh",
        help: "Fetch the model catalog again.",
        handler: handlers::model::handle_refresh,
    },
    Command {
        name: "set",
        usage: "/set <param> <value>",
        help: "Change temperature, top_p, presence_penalty, frequency_penalty or max_tokens.",
        handler: handlers::model::handle_set,
    },
    Command {
        name: "stats",
        usage: "/stats",
        help: "Show estimated token usage and cost of this chat.",
        handler: handlers::model::handle_stats,
    },
    Command {
        name: "new",
        usage: "/new",
        help: "Start a new chat.",
        handler: handlers::history::handle_new,
    },
    Command {
        name: "history",
        usage: "/history",
        help: "List saved chats, newest first.",
        handler: handlers::history::handle_history,
    },
    Command {
        name: "load",
        usage: "/load <id>",
        help: "Replace the current chat with a saved one.",
        handler: handlers::history::handle_load,
    },
    Command {
        name: "delete",
        usage: "/delete <id>",
        help: "Delete a saved chat.",
        handler: handlers::history::handle_delete,
    },
    Command {
        name: "clear-history",
        usage: "/clear-history",
        help: "Delete every saved chat and start over.",
        handler: handlers::history::handle_clear_history,
    },
    Command {
        name: "attach",
        usage: "/attach <path>",
        help: "Send a text, PDF, DOCX or image file with the next message.",
        handler: handlers::core::handle_attach,
    },
    Command {
        name: "system",
        usage: "/system [prompt]",
        help: "Show or replace the system prompt. Use /system - to clear it.",
        handler: handlers::config::handle_system,
    },
    Command {
        name: "key",
        usage: "/key <api-key>",
        help: "Store a new API key.",
        handler: handlers::config::handle_key,
    },
    Command {
        name: "forget",
        usage: "/forget <id>",
        help: "Remove a model from the saved configuration.",
        handler: handlers::config::handle_forget,
    },
    Command {
        name: "reset-config",
        usage: "/reset-config",
        help: "Delete the configuration file.",
        handler: handlers::config::handle_reset_config,
    },
    Command {
        name: "quit",
        usage: "/quit",
        help: "Leave the chat.",
        handler: handlers::core::handle_quit,
    },
];
