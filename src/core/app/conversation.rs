use std::path::Path;

use serde_json::Value;
use tracing::warn;

use super::{App, AppError};
use crate::core::accounting::{compute_stats, TokenStats};
use crate::core::attachments::read_attachment;
use crate::core::chat::{send_turn, TurnReply};
use crate::core::message::Message;
use crate::core::persistence::{
    split_header, with_header, ConversationMetaHeader, SessionId, SessionSummary,
};
use crate::core::session::{ParamUpdate, TokenCounters};

impl App {
    /// Run one turn. On success the conversation is snapshotted to a new
    /// history file, the selection and credential are remembered, and the
    /// running counters are refreshed.
    pub async fn send(&mut self, prompt: &str) -> Result<TurnReply, AppError> {
        let reply = send_turn(
            self.gateway.as_ref(),
            &mut self.session,
            &self.catalog,
            prompt,
        )
        .await?;

        self.snapshot();
        self.config.last_selected_model = self.session.selected_model.clone();
        self.config.api_key = self.session.api_key.clone();
        self.save_config();
        self.refresh_counters();
        Ok(reply)
    }

    fn snapshot(&self) {
        let header = self.session.header_for(&self.session.selected_model);
        let mut records = with_header(header, &self.session.messages);
        if let Err(err) = self.store.save(&mut records, &self.session.system_prompt) {
            warn!("could not save chat snapshot: {err}");
        }
    }

    fn refresh_counters(&mut self) {
        let stats = self.stats();
        self.session.counters = TokenCounters {
            input: stats.input_tokens,
            output: stats.output_tokens,
            total: stats.total_tokens,
            cost_total: stats.total_cost,
        };
    }

    pub fn stats(&self) -> TokenStats {
        compute_stats(&self.session.messages, self.selected_entry())
    }

    pub fn new_chat(&mut self) {
        self.session.clear_conversation();
        self.refresh_counters();
    }

    pub fn history(&self) -> Vec<SessionSummary> {
        self.store.summaries()
    }

    fn existing_session(&self, id: &str) -> Result<SessionId, AppError> {
        SessionId::parse(id)
            .filter(|id| self.store.path_for(id).exists())
            .ok_or_else(|| AppError::UnknownSession(id.to_string()))
    }

    /// Header and messages of a saved chat.
    pub fn show_chat(
        &self,
        id: &str,
    ) -> Result<(Option<ConversationMetaHeader>, Vec<Message>), AppError> {
        let id = self.existing_session(id)?;
        Ok(split_header(self.store.try_load(&id)?))
    }

    /// Replace the live conversation with a saved chat's messages. The
    /// selected model and parameters stay as they are.
    pub fn load_chat(&mut self, id: &str) -> Result<usize, AppError> {
        let (_, messages) = self.show_chat(id)?;
        self.session.messages = messages;
        self.session.attachments.clear();
        self.refresh_counters();
        Ok(self.session.messages.len())
    }

    pub fn delete_chat(&self, id: &str) -> Result<(), AppError> {
        let id = self.existing_session(id)?;
        self.store.delete(&id)?;
        Ok(())
    }

    /// Remove every saved chat and empty the live conversation.
    pub fn clear_history(&mut self) -> Result<usize, AppError> {
        let removed = self.store.clear_all()?;
        self.new_chat();
        Ok(removed)
    }

    pub fn set_system_prompt(&mut self, prompt: &str) {
        self.session.system_prompt = prompt.trim().to_string();
    }

    /// Update a generation parameter from user text. Numbers are parsed as
    /// JSON; anything else reaches the schema as a string and is replaced
    /// by the field default.
    pub fn set_param(&mut self, name: &str, raw: &str) -> Result<ParamUpdate, AppError> {
        let value = serde_json::from_str::<Value>(raw.trim())
            .unwrap_or_else(|_| Value::String(raw.trim().to_string()));
        let entry = self.catalog.get(&self.session.selected_model);
        Ok(self.session.set_param(name, &value, entry)?)
    }

    /// Queue a file for the next turn; returns its display name.
    pub fn attach(&mut self, path: &Path) -> Result<String, AppError> {
        let attachment = read_attachment(path, self.extractor.as_ref())?;
        let name = attachment.name().to_string();
        self.session.attachments.push(attachment);
        Ok(name)
    }
}
