//! Line-based chat loop over stdin.

use std::error::Error;
use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::commands::{process_input, switch_note, CommandResult};
use crate::core::app::{App, CatalogSource, StartupReport};
use crate::core::message::Message;

/// One transcript entry as printed in the terminal.
pub fn render_message(message: &Message) -> String {
    let mut text = format!("{}: {}", message.role.as_str(), message.content.text());
    let images = message.content.images().count();
    if images > 0 {
        let plural = if images == 1 { "" } else { "s" };
        text.push_str(&format!("\n  [{images} image{plural} attached]"));
    }
    text
}

pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(render_message)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn startup_banner(app: &App, report: &StartupReport) -> Vec<String> {
    let mut lines = Vec::new();
    if report.catalog_source == CatalogSource::Cached {
        lines.push("⚠️  Gateway unreachable; using the saved model list.".to_string());
    }
    if let Some(model) = &report.replaced_model {
        lines.push(format!("Model {model} is no longer offered."));
    }
    match &app.session.selected_model {
        model if model.is_empty() => lines.push("No model selected. Use /models.".to_string()),
        model => lines.push(format!("Model: {model}")),
    }
    if let Some(id) = &report.restored {
        lines.push(format!(
            "Restored chat {id} ({} messages).",
            app.session.messages.len()
        ));
    }
    lines.push("Type /help for commands, /quit to leave.".to_string());
    lines
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

pub async fn run_chat(app: &mut App) -> Result<(), Box<dyn Error>> {
    let report = app.start().await?;
    for line in startup_banner(app, &report) {
        println!("{line}");
    }
    if !app.session.messages.is_empty() {
        println!();
        println!("{}", render_transcript(&app.session.messages));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match process_input(app, &line) {
            CommandResult::Continue => {}
            CommandResult::Output(text) => println!("{text}"),
            CommandResult::Reload(note) => {
                println!();
                println!("{}", render_transcript(&app.session.messages));
                app.acknowledge_reload();
                println!("{note}");
            }
            CommandResult::ProcessAsMessage(text) => {
                debug!(chars = text.len(), "sending turn");
                match app.send(&text).await {
                    Ok(reply) => {
                        if reply.dropped_images > 0 {
                            println!(
                                "Note: {} does not accept images; {} image(s) were not sent.",
                                app.session.selected_model, reply.dropped_images
                            );
                        }
                        println!("assistant: {}", reply.content);
                    }
                    Err(err) => eprintln!("Error: {err}"),
                }
            }
            CommandResult::RefreshModels => match app.refresh_models().await {
                Ok(refreshed) => {
                    println!("{} models available.", refreshed.models);
                    if let Some(note) = refreshed
                        .switch
                        .as_ref()
                        .and_then(|(model, outcome)| switch_note(model, outcome))
                    {
                        println!();
                        println!("{}", render_transcript(&app.session.messages));
                        app.acknowledge_reload();
                        println!("{note}");
                    }
                }
                Err(err) => eprintln!("Could not refresh models: {err}"),
            },
            CommandResult::Quit => break,
        }
    }
    Ok(())
}
