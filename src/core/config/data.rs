use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::models::Attribution;
use crate::core::catalog::{CatalogEntry, FixedParamOverrides, ModelCatalog};
use crate::core::constants::DEFAULT_BASE_URL;
use crate::core::session::GenerationParams;

/// Long-lived state written after catalog refreshes and successful turns.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api_key: String,
    /// Sorted, de-duplicated.
    pub saved_models: Vec<String>,
    /// Sorted, de-duplicated subset of `saved_models`.
    pub saved_multimodal: Vec<String>,
    pub model_info: BTreeMap<String, CatalogEntry>,
    pub last_selected_model: String,
}

/// Whether models that disappear from the gateway stay in the saved catalog.
#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CatalogRetention {
    #[default]
    Preserve,
    Prune,
}

/// Hand-edited user settings (`settings.toml`).
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub base_url: Option<String>,
    pub site_url: Option<String>,
    pub site_name: Option<String>,
    /// Overrides the chat-history directory.
    pub chat_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub catalog_retention: CatalogRetention,
    /// Parameters a new conversation starts with.
    pub generation: GenerationParams,
    /// Per-model parameters the user may not change, keyed by model id.
    pub fixed_params: FixedParamOverrides,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

fn sorted_unique<'a>(ids: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    ids.into_iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

impl AppConfig {
    /// The saved catalog, used when the gateway cannot be reached.
    pub fn catalog(&self) -> ModelCatalog {
        ModelCatalog::from_parts(&self.saved_models, &self.saved_multimodal, &self.model_info)
    }

    /// Fold a fresh catalog into the saved one. Fresh entries replace saved
    /// ones; models missing from `catalog` are kept unless `retention` prunes.
    pub fn merge_catalog(&mut self, catalog: &ModelCatalog, retention: CatalogRetention) {
        if retention == CatalogRetention::Prune {
            self.saved_models.retain(|id| catalog.contains(id));
            self.saved_multimodal.retain(|id| catalog.contains(id));
            self.model_info.retain(|id, _| catalog.contains(id));
        }

        self.saved_models = sorted_unique(self.saved_models.iter().chain(catalog.model_ids()));
        // A fresh classification wins over the saved one.
        self.saved_multimodal.retain(|id| !catalog.contains(id));
        self.saved_multimodal =
            sorted_unique(self.saved_multimodal.iter().chain(catalog.multimodal_ids()));
        self.model_info.extend(
            catalog
                .entries()
                .iter()
                .map(|(id, entry)| (id.clone(), entry.clone())),
        );
    }

    /// Forget one model everywhere. Returns false when it was not saved.
    pub fn remove_model(&mut self, model_id: &str) -> bool {
        let before = self.saved_models.len();
        self.saved_models.retain(|id| id != model_id);
        self.saved_multimodal.retain(|id| id != model_id);
        let had_info = self.model_info.remove(model_id).is_some();
        if self.last_selected_model == model_id {
            self.last_selected_model = self.saved_models.first().cloned().unwrap_or_default();
        }
        had_info || self.saved_models.len() != before
    }
}

impl Settings {
    /// Environment first, then settings, then the built-in gateway.
    pub fn resolve_base_url(&self, env_override: Option<String>) -> String {
        env_override
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.base_url.clone().filter(|url| !url.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn attribution(&self) -> Attribution {
        Attribution {
            site_url: self.site_url.clone().unwrap_or_default(),
            site_name: self.site_name.clone().unwrap_or_default(),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
