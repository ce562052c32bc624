use tracing::{debug, info, warn};

use super::{App, AppError};
use crate::core::catalog::{self, CatalogEntry};
use crate::core::config::defaults::first_priced_model;
use crate::core::reconciler::SwitchOutcome;
use crate::core::validation::{validate_model_config, ValidatedConfig};

/// Result of a successful catalog refresh.
#[derive(Debug)]
pub struct RefreshOutcome {
    pub models: usize,
    /// The selected model left the catalog and the chat moved to another one.
    pub switch: Option<(String, SwitchOutcome)>,
}

impl App {
    /// Fetch the live catalog and fold it into the saved configuration.
    /// An error or an empty listing leaves the current catalog in place.
    /// A selected model that disappeared is replaced through the
    /// reconciler, so pending turns are saved under the model that
    /// produced them.
    pub async fn refresh_models(&mut self) -> Result<RefreshOutcome, AppError> {
        self.ensure_credential()?;
        let fresh = catalog::refresh(
            self.gateway.as_ref(),
            &self.session.api_key,
            &self.settings.fixed_params,
        )
        .await?;
        if fresh.is_empty() {
            return Err(AppError::EmptyCatalog);
        }

        if self.config.saved_models.is_empty() {
            // First listing: the default selection is the first priced model.
            if self.config.last_selected_model.is_empty() {
                self.config.last_selected_model =
                    first_priced_model(&fresh).unwrap_or_default();
            }
        }
        self.config.api_key = self.session.api_key.clone();
        self.config
            .merge_catalog(&fresh, self.settings.catalog_retention);
        self.save_config();

        info!(models = fresh.len(), "model catalog refreshed");
        self.catalog = fresh;

        let departed = self
            .reconciler
            .active_model()
            .filter(|active| !self.catalog.contains(active))
            .map(str::to_string);
        let switch = match (departed, self.catalog.first().map(str::to_string)) {
            (Some(active), Some(fallback)) => {
                warn!("model '{active}' left the catalog, switching to '{fallback}'");
                let outcome = self.select_model(&fallback)?;
                Some((fallback, outcome))
            }
            _ => {
                self.settle_selection();
                None
            }
        };

        Ok(RefreshOutcome {
            models: self.catalog.len(),
            switch,
        })
    }

    /// Keep the selection inside the catalog and apply its limits. Returns
    /// the replaced id when the selection had to be reset.
    pub(super) fn settle_selection(&mut self) -> Option<String> {
        if self.session.selected_model.is_empty() {
            self.session.selected_model = self.config.last_selected_model.clone();
        }
        let replaced = self.session.ensure_selected_model(&self.catalog);
        if let Some(entry) = self.catalog.get(&self.session.selected_model) {
            self.session.apply_model_limits(entry);
        }
        replaced
    }

    /// Switch to `model_id`, flushing the pending conversation under the
    /// previous model first.
    pub fn select_model(&mut self, model_id: &str) -> Result<SwitchOutcome, AppError> {
        let entry = self
            .catalog
            .get(model_id)
            .cloned()
            .ok_or_else(|| AppError::UnknownModel(model_id.to_string()))?;

        let outcome = self
            .reconciler
            .reconcile(model_id, &mut self.session, &self.store);
        self.session.apply_model_limits(&entry);
        debug!(model = model_id, ?outcome, "model selected");

        if self.config.last_selected_model != model_id {
            self.config.last_selected_model = model_id.to_string();
            self.save_config();
        }
        Ok(outcome)
    }

    pub fn selected_entry(&self) -> Option<&CatalogEntry> {
        self.catalog.get(&self.session.selected_model)
    }

    /// Validated configuration of a catalog model.
    pub fn model_config(&self, model_id: &str) -> Option<ValidatedConfig> {
        self.catalog
            .get(model_id)
            .map(|entry| validate_model_config(model_id, &entry.raw_config()))
    }

    /// Forget a model in the saved configuration. The live catalog keeps it
    /// until the next refresh.
    pub fn forget_model(&mut self, model_id: &str) -> Result<bool, AppError> {
        let removed = self.config.remove_model(model_id);
        if removed {
            self.config.save_to_path(&self.paths.config_file)?;
        }
        Ok(removed)
    }
}
