//! Shared constants used across the application

/// Gateway used when neither the environment nor settings name one.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Environment variable overriding the gateway base URL.
pub const BASE_URL_ENV: &str = "OPENROUTER_BASE_URL";

/// Environment variable supplying the credential when no config exists yet.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Context window assumed for models that do not report one.
pub const DEFAULT_CONTEXT_LENGTH: u32 = 4096;

/// Provider tags that mark a model as accepting non-text input.
pub const MULTIMODAL_TAGS: &[&str] = &["multimodal", "vision", "image", "audio"];

/// Input modalities that mark a model as accepting images.
pub const MULTIMODAL_INPUTS: &[&str] = &["image", "video"];

/// Gateway prices are quoted per token; the catalog stores USD per this many tokens.
pub const TOKENS_PER_PRICE_UNIT: f64 = 1_000_000.0;

/// Directory name for persisted conversations under the data directory.
pub const CHAT_HISTORY_DIR: &str = "chat_history";

/// Label prefixed to attached file text inside the user prompt.
pub const FILE_CONTEXT_LABEL: &str = "[File Context]:";
