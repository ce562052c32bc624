//! One request/response turn against the completion endpoint.

use std::error::Error as StdError;
use std::fmt;
use tracing::{debug, warn};

use crate::api::gateway::Gateway;
use crate::api::{ApiError, ChatMessage, ChatRequest};
use crate::core::attachments::{combine, compose_prompt};
use crate::core::catalog::ModelCatalog;
use crate::core::message::Message;
use crate::core::session::SessionState;

#[derive(Debug)]
pub enum ChatError {
    MissingCredential,
    NoModelSelected,
    EmptyPrompt,
    Api(ApiError),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::MissingCredential => write!(f, "No API key is configured"),
            ChatError::NoModelSelected => write!(f, "No model is selected"),
            ChatError::EmptyPrompt => write!(f, "Nothing to send"),
            ChatError::Api(err) => write!(f, "{err}"),
        }
    }
}

impl StdError for ChatError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ChatError::Api(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ApiError> for ChatError {
    fn from(err: ApiError) -> Self {
        ChatError::Api(err)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub content: String,
    /// Images left out because the selected model is text-only.
    pub dropped_images: usize,
}

/// The user message for `prompt` plus pending attachments. Images are only
/// included when `multimodal` is set; otherwise their count is returned.
pub fn build_user_message(
    prompt: &str,
    session: &SessionState,
    multimodal: bool,
) -> (Message, usize) {
    let parsed = combine(&session.attachments);
    let text = compose_prompt(prompt, &parsed.file_context);
    if parsed.images.is_empty() {
        return (Message::user(text), 0);
    }
    if multimodal {
        (Message::user_with_images(text, parsed.images), 0)
    } else {
        (Message::user(text), parsed.images.len())
    }
}

/// Request body: non-empty system prompt first, then history, then `next`.
pub fn build_request(session: &SessionState, next: &Message) -> ChatRequest {
    let system = session.system_prompt.trim();
    let system_message = (!system.is_empty()).then(|| Message::system(system));

    let messages = system_message
        .iter()
        .chain(session.messages.iter())
        .chain(std::iter::once(next))
        .map(ChatMessage::from)
        .collect();

    let params = session.params;
    ChatRequest {
        model: session.selected_model.clone(),
        messages,
        temperature: params.temperature,
        max_tokens: params.max_tokens,
        top_p: params.top_p,
        presence_penalty: params.presence_penalty,
        frequency_penalty: params.frequency_penalty,
    }
}

/// Send `prompt` with the pending attachments. The conversation only grows
/// when the gateway answers; on any error the session is left untouched.
pub async fn send_turn(
    gateway: &dyn Gateway,
    session: &mut SessionState,
    catalog: &ModelCatalog,
    prompt: &str,
) -> Result<TurnReply, ChatError> {
    if !session.has_credential() {
        return Err(ChatError::MissingCredential);
    }
    if session.selected_model.is_empty() {
        return Err(ChatError::NoModelSelected);
    }
    let prompt = prompt.trim();
    if prompt.is_empty() && session.attachments.is_empty() {
        return Err(ChatError::EmptyPrompt);
    }

    let multimodal = catalog.is_multimodal(&session.selected_model);
    let (user_message, dropped_images) = build_user_message(prompt, session, multimodal);
    if dropped_images > 0 {
        warn!(
            model = %session.selected_model,
            dropped_images,
            "model does not accept images; sending text only"
        );
    }

    let request = build_request(session, &user_message);
    let content = gateway.complete(&session.api_key, &request).await?;
    debug!(model = %request.model, chars = content.len(), "completion received");

    session.messages.push(user_message);
    session.messages.push(Message::assistant(content.clone()));
    session.attachments.clear();

    Ok(TurnReply {
        content,
        dropped_images,
    })
}
