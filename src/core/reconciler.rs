//! Model-switch reconciliation.
//!
//! A conversation file captures one model's settings. When the selected
//! model changes mid-conversation, the pending messages are flushed to disk
//! under the model that produced them and the live conversation restarts
//! empty for the new model.

use tracing::{debug, warn};

use crate::core::persistence::{with_header, ChatStore, PersistenceError, SessionId};
use crate::core::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchState {
    #[default]
    Idle,
    SwitchDetected,
    /// The switch has been applied; the view must be rebuilt from scratch
    /// before returning to `Idle`.
    Flushed,
}

#[derive(Debug)]
pub enum SwitchOutcome {
    Unchanged,
    /// No pending messages, so nothing was persisted.
    Switched { previous: String },
    Flushed {
        previous: String,
        saved: Option<SessionId>,
    },
    /// Persisting failed. The conversation stays in memory under the new model.
    FlushFailed {
        previous: String,
        error: PersistenceError,
    },
}

impl SwitchOutcome {
    pub fn needs_reload(&self) -> bool {
        !matches!(self, SwitchOutcome::Unchanged)
    }
}

#[derive(Debug, Default)]
pub struct ModelSwitchReconciler {
    active: Option<String>,
    state: SwitchState,
}

impl ModelSwitchReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SwitchState {
        self.state
    }

    pub fn active_model(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Record `model` as active without flushing anything.
    pub fn track(&mut self, model: &str) {
        self.active = Some(model.to_string());
    }

    /// Compare `selected` with the last active model and, on a change, flush
    /// the pending conversation under the previous model before adopting
    /// the new one.
    pub fn reconcile(
        &mut self,
        selected: &str,
        session: &mut SessionState,
        store: &ChatStore,
    ) -> SwitchOutcome {
        let previous = match self.active.as_deref() {
            Some(active) if active != selected => active.to_string(),
            Some(_) => {
                session.selected_model = selected.to_string();
                return SwitchOutcome::Unchanged;
            }
            None => {
                self.track(selected);
                session.selected_model = selected.to_string();
                return SwitchOutcome::Unchanged;
            }
        };

        self.state = SwitchState::SwitchDetected;
        debug!(from = %previous, to = selected, pending = session.messages.len(), "model switch detected");

        let outcome = if session.messages.is_empty() {
            SwitchOutcome::Switched {
                previous: previous.clone(),
            }
        } else {
            let mut records = with_header(session.header_for(&previous), &session.messages);
            match store.save(&mut records, &session.system_prompt) {
                Ok(saved) => {
                    session.messages.clear();
                    SwitchOutcome::Flushed {
                        previous: previous.clone(),
                        saved,
                    }
                }
                Err(error) => {
                    warn!("could not flush conversation for {previous}: {error}");
                    SwitchOutcome::FlushFailed {
                        previous: previous.clone(),
                        error,
                    }
                }
            }
        };

        self.track(selected);
        session.selected_model = selected.to_string();
        self.state = SwitchState::Flushed;
        outcome
    }

    /// The view has been rebuilt after a switch.
    pub fn acknowledge_reload(&mut self) {
        if self.state == SwitchState::Flushed {
            self.state = SwitchState::Idle;
        }
    }
}
