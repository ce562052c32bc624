use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;

use crate::core::message::{Message, MessageContent, Role};

pub mod gateway;
pub mod models;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Body of a non-streaming `chat/completions` request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
}

#[derive(Deserialize)]
pub struct ChatCompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatCompletionChoice {
    pub message: ChatCompletionMessage,
}

#[derive(Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatCompletionChoice>,
}

/// Prices as reported by the gateway: USD per token (prompt/completion) and
/// USD per image. Providers send them either as strings or as numbers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DescriptorPricing {
    #[serde(default, deserialize_with = "price_value")]
    pub prompt: Option<f64>,
    #[serde(default, deserialize_with = "price_value")]
    pub completion: Option<f64>,
    #[serde(default, deserialize_with = "price_value")]
    pub image: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelArchitecture {
    #[serde(default)]
    pub modality: Option<String>,
    #[serde(default)]
    pub input_modalities: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pricing: Option<DescriptorPricing>,
    #[serde(default)]
    pub context_length: Option<u64>,
    #[serde(default)]
    pub architecture: Option<ModelArchitecture>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub multimodal: Option<bool>,
}

#[derive(Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub data: Vec<ModelDescriptor>,
}

fn price_value<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }))
}

/// Failures talking to the gateway. None of these mutate conversation state;
/// callers decide whether to degrade (empty catalog) or surface the message.
#[derive(Debug)]
pub enum ApiError {
    /// Network fault, timeout, or TLS failure.
    Transport(reqwest::Error),

    /// The gateway answered with a non-success status.
    Status {
        status: reqwest::StatusCode,
        message: String,
    },

    /// The body could not be decoded into the expected shape.
    Decode(String),

    /// A completion arrived without any message content.
    EmptyCompletion,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(err) => write!(f, "Request failed: {err}"),
            ApiError::Status { status, message } => {
                write!(f, "API request failed with status {status}: {message}")
            }
            ApiError::Decode(detail) => write!(f, "Unexpected API response: {detail}"),
            ApiError::EmptyCompletion => write!(f, "The model returned an empty response"),
        }
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ApiError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err)
        }
    }
}
