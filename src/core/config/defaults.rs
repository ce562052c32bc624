use crate::core::catalog::ModelCatalog;
use crate::core::config::data::{AppConfig, Settings};
use crate::core::session::{SessionDefaults, UiPrefs};

/// First model in provider order that carries a price.
pub fn first_priced_model(catalog: &ModelCatalog) -> Option<String> {
    catalog
        .model_ids()
        .iter()
        .find(|id| catalog.get(id).is_some_and(|entry| entry.pricing.is_priced()))
        .cloned()
}

impl AppConfig {
    /// Defaults for a first run: only a credential, if the environment has one.
    pub fn bootstrap(env_api_key: Option<String>) -> AppConfig {
        AppConfig {
            api_key: env_api_key
                .map(|key| key.trim().to_string())
                .unwrap_or_default(),
            ..AppConfig::default()
        }
    }

    /// A first-run configuration seeded from a live catalog. Free models are
    /// left out; the first priced model becomes the selection.
    pub fn from_catalog(api_key: String, catalog: &ModelCatalog) -> AppConfig {
        let priced: Vec<&str> = catalog
            .model_ids()
            .iter()
            .map(String::as_str)
            .filter(|id| catalog.get(id).is_some_and(|entry| entry.pricing.is_priced()))
            .collect();

        let mut saved_models: Vec<String> = priced.iter().map(|id| id.to_string()).collect();
        saved_models.sort();
        let saved_multimodal = saved_models
            .iter()
            .filter(|id| catalog.is_multimodal(id))
            .cloned()
            .collect();
        let model_info = priced
            .iter()
            .filter_map(|id| catalog.get(id).map(|entry| (id.to_string(), entry.clone())))
            .collect();

        AppConfig {
            api_key,
            saved_models,
            saved_multimodal,
            model_info,
            last_selected_model: first_priced_model(catalog).unwrap_or_default(),
        }
    }

    /// Session seed values from the saved state and user settings.
    pub fn session_defaults(&self, settings: &Settings) -> SessionDefaults {
        SessionDefaults {
            api_key: self.api_key.clone(),
            selected_model: self.last_selected_model.clone(),
            params: settings.generation,
            messages: Vec::new(),
            system_prompt: String::new(),
            ui: UiPrefs::default(),
        }
    }
}
