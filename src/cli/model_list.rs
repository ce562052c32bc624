//! Model listing functionality
//!
//! Renders the catalog for the `models` subcommand and the `/models` and
//! `/info` chat commands.

use std::error::Error;

use crate::core::app::{App, CatalogSource};
use crate::core::catalog::{CatalogEntry, ModelCatalog};
use crate::core::validation::ValidatedConfig;

fn price(value: f64) -> String {
    if value > 0.0 {
        format!("${value:.2}")
    } else {
        "free".to_string()
    }
}

fn catalog_line(entry: &CatalogEntry, selected: bool) -> String {
    let marker = if selected { "*" } else { " " };
    format!(
        "{marker} {}  in {} / out {} per 1M  ctx {}",
        entry.id,
        price(entry.pricing.prompt),
        price(entry.pricing.completion),
        entry.context_length
    )
}

/// Text models first, then multimodal ones; `selected` is starred.
pub fn format_catalog(catalog: &ModelCatalog, selected: Option<&str>) -> String {
    let mut text_lines = Vec::new();
    let mut multimodal_lines = Vec::new();
    for id in catalog.picker_order() {
        let Some(entry) = catalog.get(id) else {
            continue;
        };
        let line = catalog_line(entry, selected == Some(id));
        if catalog.is_multimodal(id) {
            multimodal_lines.push(line);
        } else {
            text_lines.push(line);
        }
    }

    let mut out = format!("{} models\n", catalog.len());
    if !text_lines.is_empty() {
        out.push_str("Text:\n");
        for line in text_lines {
            out.push_str(&format!("  {line}\n"));
        }
    }
    if !multimodal_lines.is_empty() {
        out.push_str("Multimodal:\n");
        for line in multimodal_lines {
            out.push_str(&format!("  {line}\n"));
        }
    }
    out.trim_end().to_string()
}

pub fn format_model_info(entry: &CatalogEntry, config: &ValidatedConfig) -> String {
    let mut out = match &entry.name {
        Some(name) if name != &entry.id => format!("{} ({name})\n", entry.id),
        _ => format!("{}\n", entry.id),
    };
    out.push_str(&format!("  Prompt:      {} $/1M tokens\n", entry.pricing.prompt));
    out.push_str(&format!("  Completion:  {} $/1M tokens\n", entry.pricing.completion));
    out.push_str(&format!("  Image:       {} $/image\n", entry.pricing.image));
    out.push_str(&format!("  Context:     {} tokens\n", entry.context_length));
    out.push_str(&format!(
        "  Multimodal:  {}\n",
        if entry.is_multimodal { "yes" } else { "no" }
    ));
    if !entry.fixed_params.is_empty() {
        let fixed: Vec<String> = entry
            .fixed_params
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        out.push_str(&format!("  Fixed:       {}\n", fixed.join(", ")));
    }
    out.push_str("Validated configuration:\n");
    for (name, value) in config.iter() {
        out.push_str(&format!("  {name} = {value}\n"));
    }
    out.trim_end().to_string()
}

pub async fn list_models(app: &mut App) -> Result<(), Box<dyn Error>> {
    let report = app.start().await?;
    if report.catalog_source == CatalogSource::Cached {
        println!("Gateway unreachable; showing the saved catalog.");
    }
    println!(
        "{}",
        format_catalog(&app.catalog, Some(&app.session.selected_model))
    );
    Ok(())
}
