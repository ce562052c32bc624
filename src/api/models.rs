use crate::api::{ApiError, ModelsResponse};
use crate::utils::url::construct_api_url;

/// Attribution headers the gateway uses to credit the calling application.
#[derive(Debug, Clone, Default)]
pub struct Attribution {
    pub site_url: String,
    pub site_name: String,
}

pub(crate) fn authorized(
    request: reqwest::RequestBuilder,
    api_key: &str,
    attribution: &Attribution,
) -> reqwest::RequestBuilder {
    request
        .header("Authorization", format!("Bearer {api_key}"))
        .header("HTTP-Referer", attribution.site_url.as_str())
        .header("X-Title", attribution.site_name.as_str())
}

pub async fn fetch_models(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    attribution: &Attribution,
) -> Result<ModelsResponse, ApiError> {
    let models_url = construct_api_url(base_url, "models");
    let request = client
        .get(models_url)
        .header("Content-Type", "application/json");

    let response = authorized(request, api_key, attribution).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ApiError::Status {
            status,
            message: crate::api::gateway::summarize_error_body(&error_text),
        });
    }

    let models_response = response.json::<ModelsResponse>().await?;
    Ok(models_response)
}
