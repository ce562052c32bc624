//! Built-in fixed generation parameters
//!
//! Some models ignore or reject user-tuned sampling parameters. The table is
//! embedded from `builtin_fixed_params.toml` at build time.

use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
pub struct BuiltinFixedParams {
    pub id: String,
    pub params: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct BuiltinFixedParamsConfig {
    models: Vec<BuiltinFixedParams>,
}

/// Load built-in fixed parameters from the embedded configuration
pub fn load_builtin_fixed_params() -> Vec<BuiltinFixedParams> {
    const CONFIG_CONTENT: &str = include_str!("../builtin_fixed_params.toml");

    let config: BuiltinFixedParamsConfig =
        toml::from_str(CONFIG_CONTENT).expect("Failed to parse builtin_fixed_params.toml");

    config.models
}

/// Fixed parameters declared for `model_id`, if any.
pub fn find_builtin_fixed_params(model_id: &str) -> Option<BTreeMap<String, serde_json::Value>> {
    load_builtin_fixed_params()
        .into_iter()
        .find(|entry| entry.id == model_id)
        .map(|entry| entry.params)
}
