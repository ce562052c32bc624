//! Declarative validation of per-model generation configuration.
//!
//! Every field has a type, an optional range or allowed-value set, and a
//! default. A value that is absent, of the wrong type, or outside its
//! declared range is replaced by the full default. Out-of-range numbers are
//! never clamped to the nearest bound.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::catalog::Modality;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Float { min: f64, max: f64 },
    Integer { min: i64, max: i64 },
    Text { allowed: &'static [&'static str] },
    Boolean,
    Mapping,
    List,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSchema {
    pub name: &'static str,
    pub kind: FieldKind,
    default: DefaultValue,
}

#[derive(Debug, Clone, Copy)]
enum DefaultValue {
    Float(f64),
    Integer(i64),
    Text(&'static str),
    Boolean(bool),
    EmptyMapping,
    EmptyList,
}

impl FieldSchema {
    pub fn default_value(&self) -> Value {
        match self.default {
            DefaultValue::Float(value) => Value::from(value),
            DefaultValue::Integer(value) => Value::from(value),
            DefaultValue::Text(value) => Value::from(value),
            DefaultValue::Boolean(value) => Value::Bool(value),
            DefaultValue::EmptyMapping => Value::Object(Map::new()),
            DefaultValue::EmptyList => Value::Array(Vec::new()),
        }
    }

    /// Whether `value` satisfies this field's type and range.
    pub fn accepts(&self, value: &Value) -> bool {
        match self.kind {
            FieldKind::Float { min, max } => value
                .as_f64()
                .is_some_and(|number| (min..=max).contains(&number)),
            FieldKind::Integer { min, max } => value
                .as_i64()
                .is_some_and(|number| (min..=max).contains(&number)),
            FieldKind::Text { allowed } => value
                .as_str()
                .is_some_and(|text| allowed.contains(&text)),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Mapping => value.is_object(),
            FieldKind::List => value.is_array(),
        }
    }

    pub fn range_hint(&self) -> String {
        match self.kind {
            FieldKind::Float { min, max } => format!("number in [{min}, {max}]"),
            FieldKind::Integer { min, max } => format!("integer in [{min}, {max}]"),
            FieldKind::Text { allowed } => format!("one of {}", allowed.join(", ")),
            FieldKind::Boolean => "true or false".to_string(),
            FieldKind::Mapping => "a mapping".to_string(),
            FieldKind::List => "a list".to_string(),
        }
    }
}

const fn field(name: &'static str, kind: FieldKind, default: DefaultValue) -> FieldSchema {
    FieldSchema {
        name,
        kind,
        default,
    }
}

const MODALITIES: &[&str] = &["text->text", "text+image->text"];

static MODEL_CONFIG_SCHEMA: &[FieldSchema] = &[
    field("temperature", FieldKind::Float { min: 0.0, max: 2.0 }, DefaultValue::Float(1.0)),
    field("top_p", FieldKind::Float { min: 0.0, max: 1.0 }, DefaultValue::Float(1.0)),
    field(
        "context_length",
        FieldKind::Integer { min: 1, max: 1_000_000 },
        DefaultValue::Integer(4096),
    ),
    field(
        "modality",
        FieldKind::Text { allowed: MODALITIES },
        DefaultValue::Text("text->text"),
    ),
    field("fixed_params", FieldKind::Mapping, DefaultValue::EmptyMapping),
    field("multimodal", FieldKind::Boolean, DefaultValue::Boolean(false)),
    field("top_k", FieldKind::Integer { min: 0, max: 1000 }, DefaultValue::Integer(0)),
    field(
        "frequency_penalty",
        FieldKind::Float { min: -2.0, max: 2.0 },
        DefaultValue::Float(0.0),
    ),
    field(
        "presence_penalty",
        FieldKind::Float { min: -2.0, max: 2.0 },
        DefaultValue::Float(0.0),
    ),
    field(
        "repetition_penalty",
        FieldKind::Float { min: 0.0, max: 2.0 },
        DefaultValue::Float(1.0),
    ),
    field(
        "max_tokens",
        FieldKind::Integer { min: 1, max: 100_000 },
        DefaultValue::Integer(1000),
    ),
    field("logit_bias", FieldKind::Mapping, DefaultValue::EmptyMapping),
    field("structured_outputs", FieldKind::Boolean, DefaultValue::Boolean(false)),
    field("stop", FieldKind::List, DefaultValue::EmptyList),
];

pub fn schema() -> &'static [FieldSchema] {
    MODEL_CONFIG_SCHEMA
}

pub fn find_field(name: &str) -> Option<&'static FieldSchema> {
    MODEL_CONFIG_SCHEMA.iter().find(|field| field.name == name)
}

/// A configuration where every schema field is present and valid.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    values: BTreeMap<&'static str, Value>,
}

impl ValidatedConfig {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn modality(&self) -> Modality {
        self.get("modality")
            .and_then(Value::as_str)
            .map(|text| Modality::from(text.to_string()))
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    /// Back into raw form, e.g. to re-validate.
    pub fn to_raw(&self) -> Map<String, Value> {
        self.values
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }
}

/// Check a single field; invalid or absent values become the default.
pub fn validate_field(schema: &FieldSchema, value: Option<&Value>) -> Value {
    match value {
        Some(value) if schema.accepts(value) => value.clone(),
        _ => schema.default_value(),
    }
}

pub fn validate_model_config(model_id: &str, raw: &Map<String, Value>) -> ValidatedConfig {
    let values = MODEL_CONFIG_SCHEMA
        .iter()
        .map(|schema| {
            let raw_value = raw.get(schema.name);
            let value = validate_field(schema, raw_value);
            if let Some(rejected) = raw_value.filter(|original| **original != value) {
                debug!(model = model_id, field = schema.name, %rejected, "replaced invalid value with default");
            }
            (schema.name, value)
        })
        .collect();
    ValidatedConfig { values }
}
