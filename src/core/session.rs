//! Live state of the one active conversation.
//!
//! `SessionState` is the explicit context object every core operation reads
//! and writes. Access is single-threaded: one request/render cycle runs to
//! completion before the next begins, and each mutation leaves the state
//! consistent before control returns to the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::error::Error as StdError;
use std::fmt;
use tracing::warn;

use crate::core::attachments::Attachment;
use crate::core::catalog::{CatalogEntry, ModelCatalog};
use crate::core::message::Message;
use crate::core::persistence::ConversationMetaHeader;
use crate::core::validation::{find_field, validate_field};

/// Sampling parameters sent with every completion and stamped into headers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub temperature: f64,
    pub top_p: f64,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 1.0,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            max_tokens: 2048,
        }
    }
}

impl GenerationParams {
    pub const NAMES: [&'static str; 5] = [
        "temperature",
        "top_p",
        "presence_penalty",
        "frequency_penalty",
        "max_tokens",
    ];

    pub fn get(&self, name: &str) -> Option<Value> {
        match name {
            "temperature" => Some(Value::from(self.temperature)),
            "top_p" => Some(Value::from(self.top_p)),
            "presence_penalty" => Some(Value::from(self.presence_penalty)),
            "frequency_penalty" => Some(Value::from(self.frequency_penalty)),
            "max_tokens" => Some(Value::from(self.max_tokens)),
            _ => None,
        }
    }

    /// Assign a numeric value by name; returns false when the name is unknown
    /// or the value is not a number of the right kind.
    fn assign(&mut self, name: &str, value: &Value) -> bool {
        match name {
            "max_tokens" => match value.as_u64().and_then(|v| u32::try_from(v).ok()) {
                Some(tokens) => {
                    self.max_tokens = tokens;
                    true
                }
                None => false,
            },
            _ => {
                let Some(number) = value.as_f64() else {
                    return false;
                };
                match name {
                    "temperature" => self.temperature = number,
                    "top_p" => self.top_p = number,
                    "presence_penalty" => self.presence_penalty = number,
                    "frequency_penalty" => self.frequency_penalty = number,
                    _ => return false,
                }
                true
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TokenCounters {
    pub input: u64,
    pub output: u64,
    pub total: u64,
    pub cost_total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UiPrefs {
    pub input_height: u16,
}

impl Default for UiPrefs {
    fn default() -> Self {
        Self { input_height: 80 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionKey {
    ApiKey,
    SelectedModel,
    Params,
    Messages,
    Counters,
    UiPrefs,
    SystemPrompt,
}

/// Values used to seed a fresh session.
#[derive(Debug, Clone, Default)]
pub struct SessionDefaults {
    pub api_key: String,
    pub selected_model: String,
    pub params: GenerationParams,
    pub messages: Vec<Message>,
    pub system_prompt: String,
    pub ui: UiPrefs,
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub api_key: String,
    pub selected_model: String,
    pub params: GenerationParams,
    pub messages: Vec<Message>,
    pub counters: TokenCounters,
    pub ui: UiPrefs,
    pub system_prompt: String,
    /// Context window of the selected model; upper bound for `max_tokens`.
    pub context_limit: Option<u32>,
    /// Files waiting to be sent with the next user turn.
    pub attachments: Vec<Attachment>,
    seeded: BTreeSet<SessionKey>,
}

/// Result of a parameter update after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamUpdate {
    pub name: String,
    pub applied: Value,
    /// The requested value was rejected by the schema and replaced by its default.
    pub substituted: bool,
    /// `max_tokens` was lowered to the model's context window.
    pub clamped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    Unknown(String),
    Fixed { name: String, value: Value },
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::Unknown(name) => write!(
                f,
                "Unknown parameter '{name}'. Expected one of: {}",
                GenerationParams::NAMES.join(", ")
            ),
            ParamError::Fixed { name, value } => {
                write!(f, "'{name}' is fixed to {value} by the selected model")
            }
        }
    }
}

impl StdError for ParamError {}

impl SessionState {
    /// Seed every key that has not been written yet. Calling this again is
    /// harmless: live values are never overwritten.
    pub fn initialize_defaults(&mut self, defaults: SessionDefaults) {
        let SessionDefaults {
            api_key,
            selected_model,
            params,
            messages,
            system_prompt,
            ui,
        } = defaults;

        if self.seed(SessionKey::ApiKey) {
            self.api_key = api_key;
        }
        if self.seed(SessionKey::SelectedModel) {
            self.selected_model = selected_model;
        }
        if self.seed(SessionKey::Params) {
            self.params = params;
        }
        if self.seed(SessionKey::Messages) {
            self.messages = messages;
        }
        if self.seed(SessionKey::Counters) {
            self.counters = TokenCounters::default();
        }
        if self.seed(SessionKey::UiPrefs) {
            self.ui = ui;
        }
        if self.seed(SessionKey::SystemPrompt) {
            self.system_prompt = system_prompt;
        }
    }

    fn seed(&mut self, key: SessionKey) -> bool {
        self.seeded.insert(key)
    }

    pub fn is_seeded(&self, key: SessionKey) -> bool {
        self.seeded.contains(&key)
    }

    /// Adopt the model, parameters and system prompt recorded in a
    /// conversation header. The restored keys count as live.
    pub fn restore_header(&mut self, header: &ConversationMetaHeader) {
        if !header.model.is_empty() {
            self.selected_model = header.model.clone();
            self.seeded.insert(SessionKey::SelectedModel);
        }
        self.params = header.meta;
        self.seeded.insert(SessionKey::Params);
        if !header.system_prompt.is_empty() {
            self.system_prompt = header.system_prompt.clone();
            self.seeded.insert(SessionKey::SystemPrompt);
        }
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Keep `selected_model` inside the catalog. Returns the rejected id when
    /// the selection had to be reset to the catalog's first entry.
    pub fn ensure_selected_model(&mut self, catalog: &ModelCatalog) -> Option<String> {
        if catalog.contains(&self.selected_model) {
            return None;
        }
        let first = catalog.first()?;
        warn!(
            "selected model '{}' not found in catalog, resetting to '{first}'",
            self.selected_model
        );
        Some(std::mem::replace(&mut self.selected_model, first.to_string()))
    }

    /// Apply the selected model's context window and fixed parameters.
    pub fn apply_model_limits(&mut self, entry: &CatalogEntry) {
        self.context_limit = Some(entry.context_length);
        if self.params.max_tokens > entry.context_length {
            self.params.max_tokens = entry.context_length;
        }
        for (name, value) in &entry.fixed_params {
            if !self.params.assign(name, value) {
                warn!(model = %entry.id, param = %name, "ignoring unsupported fixed parameter");
            }
        }
    }

    /// Change one generation parameter through the model-config schema.
    pub fn set_param(
        &mut self,
        name: &str,
        value: &Value,
        entry: Option<&CatalogEntry>,
    ) -> Result<ParamUpdate, ParamError> {
        let schema = find_field(name)
            .filter(|_| GenerationParams::NAMES.contains(&name))
            .ok_or_else(|| ParamError::Unknown(name.to_string()))?;

        if let Some(fixed) = entry.and_then(|entry| entry.fixed_param(name)) {
            return Err(ParamError::Fixed {
                name: name.to_string(),
                value: fixed.clone(),
            });
        }

        let validated = validate_field(schema, Some(value));
        let substituted = validated != *value;
        self.params.assign(name, &validated);

        let mut clamped = false;
        if let Some(limit) = self.context_limit {
            if self.params.max_tokens > limit {
                self.params.max_tokens = limit;
                clamped = name == "max_tokens";
            }
        }

        Ok(ParamUpdate {
            name: name.to_string(),
            applied: self.params.get(name).unwrap_or(validated),
            substituted,
            clamped,
        })
    }

    /// Header describing the live generation settings under `model`.
    pub fn header_for(&self, model: &str) -> ConversationMetaHeader {
        ConversationMetaHeader {
            model: model.to_string(),
            meta: self.params,
            system_prompt: self.system_prompt.clone(),
        }
    }

    /// Start an empty conversation; model and parameters stay as they are.
    pub fn clear_conversation(&mut self) {
        self.messages.clear();
        self.attachments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{catalog_entry, sample_catalog};
    use serde_json::json;

    fn seeded_state() -> SessionState {
        let mut state = SessionState::default();
        state.initialize_defaults(SessionDefaults {
            api_key: "key".into(),
            selected_model: "vendor/alpha".into(),
            ..Default::default()
        });
        state
    }

    #[test]
    fn initialize_defaults_never_overwrites_live_values() {
        let mut state = seeded_state();
        state.messages.push(Message::user("hi"));
        state.params.temperature = 0.2;

        state.initialize_defaults(SessionDefaults {
            api_key: "other".into(),
            selected_model: "vendor/beta".into(),
            ..Default::default()
        });

        assert_eq!(state.api_key, "key");
        assert_eq!(state.selected_model, "vendor/alpha");
        assert_eq!(state.params.temperature, 0.2);
        assert_eq!(state.messages.len(), 1);
    }

    #[test]
    fn restored_header_survives_default_seeding() {
        let mut state = SessionState::default();
        state.restore_header(&ConversationMetaHeader {
            model: "vendor/beta".into(),
            meta: GenerationParams {
                temperature: 0.1,
                max_tokens: 512,
                ..Default::default()
            },
            system_prompt: "be terse".into(),
        });
        state.initialize_defaults(SessionDefaults {
            selected_model: "vendor/alpha".into(),
            system_prompt: String::new(),
            ..Default::default()
        });

        assert_eq!(state.selected_model, "vendor/beta");
        assert_eq!(state.params.temperature, 0.1);
        assert_eq!(state.params.max_tokens, 512);
        assert_eq!(state.system_prompt, "be terse");
        assert!(state.is_seeded(SessionKey::ApiKey));
    }

    #[test]
    fn missing_selection_resets_to_first_catalog_entry() {
        let catalog = sample_catalog();
        let mut state = seeded_state();
        state.selected_model = "gone/model".into();

        assert_eq!(state.ensure_selected_model(&catalog), Some("gone/model".into()));
        assert_eq!(state.selected_model, catalog.first().unwrap());
        assert_eq!(state.ensure_selected_model(&catalog), None);
    }

    #[test]
    fn empty_catalog_leaves_selection_alone() {
        let mut state = seeded_state();
        assert_eq!(state.ensure_selected_model(&ModelCatalog::default()), None);
        assert_eq!(state.selected_model, "vendor/alpha");
    }

    #[test]
    fn max_tokens_is_clamped_to_context_length() {
        let mut state = seeded_state();
        state.params.max_tokens = 4096;
        state.apply_model_limits(&catalog_entry("gpt-x", 2048));
        assert_eq!(state.params.max_tokens, 2048);
        assert_eq!(state.context_limit, Some(2048));
    }

    #[test]
    fn fixed_params_override_user_values() {
        let mut state = seeded_state();
        state.params.temperature = 0.9;
        let mut entry = catalog_entry("mistral/small", 32_000);
        entry.fixed_params.insert("temperature".into(), json!(0.0));
        state.apply_model_limits(&entry);
        assert_eq!(state.params.temperature, 0.0);

        let err = state.set_param("temperature", &json!(0.5), Some(&entry)).unwrap_err();
        assert!(matches!(err, ParamError::Fixed { .. }));
        assert_eq!(state.params.temperature, 0.0);
    }

    #[test]
    fn set_param_substitutes_schema_default_for_invalid_values() {
        let mut state = seeded_state();
        let update = state.set_param("temperature", &json!(3.5), None).unwrap();
        assert!(update.substituted);
        assert_eq!(update.applied, json!(1.0));
        assert_eq!(state.params.temperature, 1.0);

        let update = state.set_param("top_p", &json!(0.25), None).unwrap();
        assert!(!update.substituted);
        assert_eq!(state.params.top_p, 0.25);
    }

    #[test]
    fn set_param_clamps_max_tokens_to_context_limit() {
        let mut state = seeded_state();
        state.apply_model_limits(&catalog_entry("gpt-x", 2048));
        let update = state.set_param("max_tokens", &json!(8000), None).unwrap();
        assert!(update.clamped);
        assert_eq!(state.params.max_tokens, 2048);
    }

    #[test]
    fn set_param_rejects_non_generation_fields() {
        let mut state = seeded_state();
        assert_eq!(
            state.set_param("context_length", &json!(10), None),
            Err(ParamError::Unknown("context_length".into()))
        );
        assert!(state.set_param("bogus", &json!(1), None).is_err());
    }

    #[test]
    fn header_carries_params_and_prompt() {
        let mut state = seeded_state();
        state.system_prompt = "stay on topic".into();
        state.params.top_p = 0.5;
        let header = state.header_for("vendor/alpha");
        assert_eq!(header.model, "vendor/alpha");
        assert_eq!(header.meta.top_p, 0.5);
        assert_eq!(header.system_prompt, "stay on topic");
    }
}
