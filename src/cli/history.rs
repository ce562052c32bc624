//! `routechat history` subcommands.

use std::error::Error;

use crate::cli::chat::render_transcript;
use crate::cli::HistoryAction;
use crate::core::app::App;

pub fn run_history(app: &App, action: HistoryAction) -> Result<(), Box<dyn Error>> {
    match action {
        HistoryAction::List => {
            let sessions = app.history();
            if sessions.is_empty() {
                println!("No saved chats in {}", app.store().dir().display());
            }
            for summary in sessions {
                println!("{summary}");
            }
        }
        HistoryAction::Show { id } => {
            let (header, messages) = app.show_chat(&id)?;
            if let Some(header) = header {
                for line in header.summary_lines() {
                    println!("{line}");
                }
                if !header.system_prompt.is_empty() {
                    println!("System prompt: {}", header.system_prompt);
                }
                println!();
            }
            println!("{}", render_transcript(&messages));
        }
        HistoryAction::Delete { id } => {
            app.delete_chat(&id)?;
            println!("Deleted chat {id}.");
        }
        HistoryAction::Clear => {
            let removed = app.store().clear_all()?;
            println!("Deleted {removed} saved chat(s).");
        }
    }
    Ok(())
}
