use crate::cli::model_list::{format_catalog, format_model_info};
use crate::commands::registry::CommandInvocation;
use crate::commands::CommandResult;
use crate::core::app::App;
use crate::core::reconciler::SwitchOutcome;
use crate::core::validation::find_field;

pub(crate) fn handle_model(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let Some(model_id) = invocation.arg(0) else {
        return CommandResult::Output(format!(
            "Active model: {}. Use /models to list the catalog.",
            app.session.selected_model
        ));
    };

    match app.select_model(model_id) {
        Ok(outcome) => match switch_note(model_id, &outcome) {
            Some(note) => CommandResult::Reload(note),
            None => CommandResult::Output(format!("Already using {model_id}.")),
        },
        Err(err) => CommandResult::Output(err.to_string()),
    }
}

/// What the user is told after the chat moved to `model_id`; `None` when
/// nothing changed.
pub fn switch_note(model_id: &str, outcome: &SwitchOutcome) -> Option<String> {
    match outcome {
        SwitchOutcome::Unchanged => None,
        SwitchOutcome::Switched { .. } => Some(format!("Switched to {model_id}.")),
        SwitchOutcome::Flushed { previous, saved } => {
            let saved = saved
                .as_ref()
                .map(|id| format!(" as {id}"))
                .unwrap_or_default();
            Some(format!(
                "Saved the {previous} chat{saved}. Switched to {model_id}."
            ))
        }
        SwitchOutcome::FlushFailed { previous, error } => Some(format!(
            "Could not save the {previous} chat ({error}); it stays open. Switched to {model_id}."
        )),
    }
}

pub(crate) fn handle_models(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    if app.catalog.is_empty() {
        return CommandResult::Output("The model catalog is empty. Try /refresh.".to_string());
    }
    CommandResult::Output(format_catalog(&app.catalog, Some(&app.session.selected_model)))
}

pub(crate) fn handle_info(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let model_id = invocation
        .arg(0)
        .unwrap_or(&app.session.selected_model)
        .to_string();
    match (app.catalog.get(&model_id), app.model_config(&model_id)) {
        (Some(entry), Some(config)) => CommandResult::Output(format_model_info(entry, &config)),
        _ => CommandResult::Output(format!("Unknown model '{model_id}'")),
    }
}

pub(crate) fn handle_refresh(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::RefreshModels
}

pub(crate) fn handle_set(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let (Some(name), Some(value)) = (invocation.arg(0), invocation.arg(1)) else {
        return super::usage("/set <param> <value>");
    };
    match app.set_param(name, value) {
        Ok(update) => {
            let mut message = format!("{} = {}", update.name, update.applied);
            if update.substituted {
                let expected = find_field(&update.name)
                    .map(|field| field.range_hint())
                    .unwrap_or_default();
                message.push_str(&format!(
                    " ('{value}' rejected, expected {expected}; using the default)"
                ));
            }
            if update.clamped {
                message.push_str(" (limited to the model's context window)");
            }
            CommandResult::Output(message)
        }
        Err(err) => CommandResult::Output(err.to_string()),
    }
}

pub(crate) fn handle_stats(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    let stats = app.stats();
    CommandResult::Output(format!(
        "Input tokens:  {}\n\
         Output tokens: {}\n\
         Total tokens:  {} of {} context\n\
         Input cost:    ${:.6}\n\
         Output cost:   ${:.6}\n\
         Total cost:    ${:.6}",
        stats.input_tokens,
        stats.output_tokens,
        stats.total_tokens,
        stats.context_limit,
        stats.input_cost,
        stats.output_cost,
        stats.total_cost,
    ))
}
