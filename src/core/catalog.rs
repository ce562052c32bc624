//! Model catalog
//!
//! Normalizes the gateway's model listing into a stable directory keyed by
//! model id. A catalog is always rebuilt wholesale from a listing; merging
//! with previously cached entries happens in the configuration layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::api::gateway::Gateway;
use crate::api::{ApiError, DescriptorPricing, ModelArchitecture, ModelDescriptor};
use crate::core::builtin_fixed_params::find_builtin_fixed_params;
use crate::core::constants::{
    DEFAULT_CONTEXT_LENGTH, MULTIMODAL_INPUTS, MULTIMODAL_TAGS, TOKENS_PER_PRICE_UNIT,
};

/// Fixed parameters declared outside the gateway listing, keyed by model id.
pub type FixedParamOverrides = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Modality {
    #[default]
    TextToText,
    TextImageToText,
}

impl Modality {
    pub fn as_str(self) -> &'static str {
        match self {
            Modality::TextToText => "text->text",
            Modality::TextImageToText => "text+image->text",
        }
    }

    fn from_architecture(architecture: Option<&ModelArchitecture>) -> Self {
        let Some(architecture) = architecture else {
            return Modality::TextToText;
        };
        if let Some(modality) = architecture.modality.as_deref() {
            return Modality::from(modality.to_string());
        }
        if architecture
            .input_modalities
            .iter()
            .any(|input| input == "image")
        {
            Modality::TextImageToText
        } else {
            Modality::TextToText
        }
    }
}

impl From<String> for Modality {
    fn from(value: String) -> Self {
        if value.starts_with("text+image") {
            Modality::TextImageToText
        } else {
            Modality::TextToText
        }
    }
}

impl From<Modality> for String {
    fn from(value: Modality) -> Self {
        value.as_str().to_string()
    }
}

/// Prices in USD: `prompt` and `completion` per 1M tokens, `image` per image.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pricing {
    #[serde(default)]
    pub prompt: f64,
    #[serde(default)]
    pub completion: f64,
    #[serde(default)]
    pub image: f64,
}

impl Pricing {
    fn from_descriptor(pricing: Option<&DescriptorPricing>) -> Self {
        let Some(pricing) = pricing else {
            return Pricing::default();
        };
        // Negative prices mark variable-price routers; treat them as unknown.
        let non_negative = |value: Option<f64>| value.filter(|v| *v > 0.0).unwrap_or(0.0);
        Pricing {
            prompt: non_negative(pricing.prompt) * TOKENS_PER_PRICE_UNIT,
            completion: non_negative(pricing.completion) * TOKENS_PER_PRICE_UNIT,
            image: non_negative(pricing.image),
        }
    }

    pub fn is_priced(&self) -> bool {
        self.prompt > 0.0 || self.completion > 0.0
    }
}

fn default_context_length() -> u32 {
    DEFAULT_CONTEXT_LENGTH
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub pricing: Pricing,
    #[serde(default = "default_context_length")]
    pub context_length: u32,
    #[serde(default)]
    pub modality: Modality,
    #[serde(default)]
    pub fixed_params: BTreeMap<String, Value>,
    #[serde(default, rename = "multimodal")]
    pub is_multimodal: bool,
}

impl CatalogEntry {
    pub fn from_descriptor(
        descriptor: &ModelDescriptor,
        overrides: Option<&BTreeMap<String, Value>>,
    ) -> Self {
        let context_length = match descriptor.context_length {
            Some(0) | None => DEFAULT_CONTEXT_LENGTH,
            Some(length) => u32::try_from(length).unwrap_or(u32::MAX),
        };

        let mut fixed_params = find_builtin_fixed_params(&descriptor.id).unwrap_or_default();
        if let Some(overrides) = overrides {
            fixed_params.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        Self {
            id: descriptor.id.clone(),
            name: descriptor.name.clone().filter(|name| !name.is_empty()),
            pricing: Pricing::from_descriptor(descriptor.pricing.as_ref()),
            context_length,
            modality: Modality::from_architecture(descriptor.architecture.as_ref()),
            fixed_params,
            is_multimodal: is_multimodal(descriptor),
        }
    }

    /// The entry's fields in the shape the model-config validator consumes.
    pub fn raw_config(&self) -> Map<String, Value> {
        let mut raw = Map::new();
        raw.insert("context_length".into(), Value::from(self.context_length));
        raw.insert("modality".into(), Value::from(self.modality.as_str()));
        raw.insert(
            "fixed_params".into(),
            Value::Object(self.fixed_params.clone().into_iter().collect()),
        );
        raw.insert("multimodal".into(), Value::Bool(self.is_multimodal));
        raw
    }

    pub fn fixed_param(&self, name: &str) -> Option<&Value> {
        self.fixed_params.get(name)
    }
}

/// A model accepts images when the provider says so explicitly, tags it with
/// a multimodal tag, or lists an image/video input modality.
pub fn is_multimodal(descriptor: &ModelDescriptor) -> bool {
    if descriptor.multimodal.unwrap_or(false) {
        return true;
    }
    if descriptor
        .tags
        .iter()
        .any(|tag| MULTIMODAL_TAGS.contains(&tag.as_str()))
    {
        return true;
    }
    descriptor.architecture.as_ref().is_some_and(|architecture| {
        architecture
            .input_modalities
            .iter()
            .any(|input| MULTIMODAL_INPUTS.contains(&input.as_str()))
    })
}

#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    model_ids: Vec<String>,
    multimodal: BTreeSet<String>,
    entries: BTreeMap<String, CatalogEntry>,
}

impl ModelCatalog {
    pub fn from_descriptors(descriptors: &[ModelDescriptor], overrides: &FixedParamOverrides) -> Self {
        let mut catalog = ModelCatalog::default();
        for descriptor in descriptors {
            if descriptor.id.is_empty() || catalog.entries.contains_key(&descriptor.id) {
                continue;
            }
            let entry = CatalogEntry::from_descriptor(descriptor, overrides.get(&descriptor.id));
            catalog.insert(entry);
        }
        catalog
    }

    /// Rebuild a catalog from previously cached parts. Ids without an entry
    /// get a default one so the directory stays total over `model_ids`.
    pub fn from_parts(
        model_ids: &[String],
        multimodal: &[String],
        entries: &BTreeMap<String, CatalogEntry>,
    ) -> Self {
        let mut catalog = ModelCatalog::default();
        for id in model_ids {
            if catalog.entries.contains_key(id) {
                continue;
            }
            let mut entry = entries.get(id).cloned().unwrap_or_else(|| CatalogEntry {
                id: id.clone(),
                name: None,
                pricing: Pricing::default(),
                context_length: DEFAULT_CONTEXT_LENGTH,
                modality: Modality::default(),
                fixed_params: BTreeMap::new(),
                is_multimodal: false,
            });
            entry.is_multimodal |= multimodal.contains(id);
            catalog.insert(entry);
        }
        catalog
    }

    fn insert(&mut self, entry: CatalogEntry) {
        self.model_ids.push(entry.id.clone());
        if entry.is_multimodal {
            self.multimodal.insert(entry.id.clone());
        }
        self.entries.insert(entry.id.clone(), entry);
    }

    pub fn is_empty(&self) -> bool {
        self.model_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.model_ids.len()
    }

    pub fn model_ids(&self) -> &[String] {
        &self.model_ids
    }

    pub fn multimodal_ids(&self) -> &BTreeSet<String> {
        &self.multimodal
    }

    pub fn entries(&self) -> &BTreeMap<String, CatalogEntry> {
        &self.entries
    }

    pub fn first(&self) -> Option<&str> {
        self.model_ids.first().map(String::as_str)
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.entries.contains_key(model_id)
    }

    pub fn get(&self, model_id: &str) -> Option<&CatalogEntry> {
        self.entries.get(model_id)
    }

    pub fn is_multimodal(&self, model_id: &str) -> bool {
        self.multimodal.contains(model_id)
    }

    /// Text-only models first, then multimodal ones, each in provider order.
    pub fn picker_order(&self) -> Vec<&str> {
        let (multimodal, text): (Vec<&str>, Vec<&str>) = self
            .model_ids
            .iter()
            .map(String::as_str)
            .partition(|id| self.multimodal.contains(*id));
        text.into_iter().chain(multimodal).collect()
    }
}

/// Fetch and normalize the gateway listing.
pub async fn refresh(
    gateway: &dyn Gateway,
    api_key: &str,
    overrides: &FixedParamOverrides,
) -> Result<ModelCatalog, ApiError> {
    match gateway.list_models(api_key).await {
        Ok(descriptors) => {
            let catalog = ModelCatalog::from_descriptors(&descriptors, overrides);
            debug!(
                models = catalog.len(),
                multimodal = catalog.multimodal_ids().len(),
                "catalog refreshed"
            );
            Ok(catalog)
        }
        Err(err) => {
            warn!("catalog refresh failed: {err}");
            Err(err)
        }
    }
}
