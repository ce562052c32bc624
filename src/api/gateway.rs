//! HTTP access to the API gateway.
//!
//! [`Gateway`] is the seam the core talks through: the real
//! [`GatewayClient`] issues requests with `reqwest`, tests substitute an
//! in-process implementation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::api::models::{authorized, fetch_models, Attribution};
use crate::api::{ApiError, ChatCompletionResponse, ChatRequest, ModelDescriptor};
use crate::utils::url::construct_api_url;

#[async_trait]
pub trait Gateway: Send + Sync {
    /// List every model the gateway exposes, in provider order.
    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelDescriptor>, ApiError>;

    /// Run one non-streaming completion and return the assistant text.
    async fn complete(&self, api_key: &str, request: &ChatRequest) -> Result<String, ApiError>;
}

pub struct GatewayClient {
    client: reqwest::Client,
    base_url: String,
    attribution: Attribution,
}

impl GatewayClient {
    pub fn new(
        base_url: impl Into<String>,
        attribution: Attribution,
        timeout: Option<Duration>,
    ) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into(),
            attribution,
        })
    }
}

#[async_trait]
impl Gateway for GatewayClient {
    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelDescriptor>, ApiError> {
        let response = fetch_models(&self.client, &self.base_url, api_key, &self.attribution).await?;
        debug!(count = response.data.len(), "fetched model listing");
        Ok(response.data)
    }

    async fn complete(&self, api_key: &str, request: &ChatRequest) -> Result<String, ApiError> {
        let url = construct_api_url(&self.base_url, "chat/completions");
        debug!(model = %request.model, messages = request.messages.len(), "sending completion");

        let response = authorized(self.client.post(url), api_key, &self.attribution)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::Status {
                status,
                message: summarize_error_body(&body),
            });
        }

        let completion = response.json::<ChatCompletionResponse>().await?;
        extract_completion_text(completion)
    }
}

pub(crate) fn extract_completion_text(
    completion: ChatCompletionResponse,
) -> Result<String, ApiError> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(ApiError::EmptyCompletion)
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.trim().to_string()
    })
}

/// Reduce an error body to one readable line.
pub(crate) fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value) {
            if !summary.is_empty() {
                return summary;
            }
        }
        return json_value.to_string();
    }

    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}
