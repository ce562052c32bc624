//! Gateway endpoint URLs.

/// Join a gateway base URL and an endpoint path with exactly one slash.
///
/// Surrounding whitespace from settings or the environment is ignored.
///
/// ```
/// use routechat::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url(" https://openrouter.ai/api/v1/ ", "/models"),
///     "https://openrouter.ai/api/v1/models"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let endpoint = endpoint.trim().trim_start_matches('/');
    format!("{base}/{endpoint}")
}
