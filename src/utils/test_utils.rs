use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::gateway::Gateway;
use crate::api::{ApiError, ChatRequest, DescriptorPricing, ModelArchitecture, ModelDescriptor};
use crate::core::catalog::{CatalogEntry, FixedParamOverrides, ModelCatalog, Modality, Pricing};

pub fn descriptor(id: &str) -> ModelDescriptor {
    ModelDescriptor {
        id: id.to_string(),
        ..Default::default()
    }
}

pub fn priced_descriptor(id: &str, prompt: f64, completion: f64) -> ModelDescriptor {
    ModelDescriptor {
        pricing: Some(DescriptorPricing {
            prompt: Some(prompt),
            completion: Some(completion),
            image: None,
        }),
        ..descriptor(id)
    }
}

pub fn vision_descriptor(id: &str) -> ModelDescriptor {
    ModelDescriptor {
        architecture: Some(ModelArchitecture {
            modality: Some("text+image->text".to_string()),
            input_modalities: vec!["text".to_string(), "image".to_string()],
        }),
        ..priced_descriptor(id, 0.000_002_5, 0.000_01)
    }
}

pub fn catalog_entry(id: &str, context_length: u32) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        name: None,
        pricing: Pricing::default(),
        context_length,
        modality: Modality::TextToText,
        fixed_params: BTreeMap::new(),
        is_multimodal: false,
    }
}

/// Descriptors as a gateway would list them: a priced text model, a priced
/// vision model, and a free model.
pub fn sample_descriptors() -> Vec<ModelDescriptor> {
    let mut text = priced_descriptor("acme/writer", 0.000_001, 0.000_002);
    text.context_length = Some(8192);
    let mut free = descriptor("acme/free");
    free.context_length = Some(2048);
    vec![text, vision_descriptor("acme/vision"), free]
}

pub fn sample_catalog() -> ModelCatalog {
    ModelCatalog::from_descriptors(&sample_descriptors(), &FixedParamOverrides::new())
}

/// In-process gateway: serves a fixed model listing and queued replies, and
/// records every completion request it receives.
pub struct FakeGateway {
    models: Mutex<Option<Vec<ModelDescriptor>>>,
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self::with_models(sample_descriptors())
    }
}

impl FakeGateway {
    pub fn with_models(models: Vec<ModelDescriptor>) -> Self {
        Self {
            models: Mutex::new(Some(models)),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A gateway whose model listing always fails.
    pub fn offline() -> Self {
        let gateway = Self::with_models(Vec::new());
        *gateway.models.lock().unwrap() = None;
        gateway
    }

    pub fn set_models(&self, models: Vec<ModelDescriptor>) {
        *self.models.lock().unwrap() = Some(models);
    }

    pub fn push_reply(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
    }

    pub fn push_failure(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn unavailable(message: String) -> ApiError {
    ApiError::Status {
        status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
        message,
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn list_models(&self, _api_key: &str) -> Result<Vec<ModelDescriptor>, ApiError> {
        self.models
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| unavailable("model listing unavailable".to_string()))
    }

    async fn complete(&self, _api_key: &str, request: &ChatRequest) -> Result<String, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(unavailable(message)),
            None => Ok("ok".to_string()),
        }
    }
}
