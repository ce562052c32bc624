//! The application facade: one [`App`] owns the configuration, the model
//! catalog, the chat store and the live session, and exposes every
//! operation the chat loop and the CLI subcommands need.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::api::gateway::Gateway;
use crate::api::ApiError;
use crate::core::attachments::{AttachmentError, DocumentExtractor, NoDocumentSupport};
use crate::core::catalog::ModelCatalog;
use crate::core::chat::ChatError;
use crate::core::config::data::{AppConfig, Settings};
use crate::core::config::io::{AppPaths, ConfigError};
use crate::core::persistence::{split_header, ChatStore, PersistenceError, SessionId};
use crate::core::reconciler::ModelSwitchReconciler;
use crate::core::session::{ParamError, SessionState};

pub mod conversation;
pub mod models;

pub use models::RefreshOutcome;


#[derive(Debug)]
pub enum AppError {
    MissingCredential,
    EmptyCatalog,
    UnknownModel(String),
    UnknownSession(String),
    UnknownParameter(String),
    FixedParameter { name: String, value: Value },
    Api(ApiError),
    Chat(ChatError),
    Config(ConfigError),
    Persistence(PersistenceError),
    Attachment(AttachmentError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MissingCredential => write!(f, "API key is missing"),
            AppError::EmptyCatalog => write!(
                f,
                "No models available. Check the API key and the gateway URL"
            ),
            AppError::UnknownModel(id) => write!(f, "Unknown model '{id}'"),
            AppError::UnknownSession(id) => write!(f, "No saved chat named '{id}'"),
            AppError::UnknownParameter(name) => {
                write!(f, "{}", ParamError::Unknown(name.clone()))
            }
            AppError::FixedParameter { name, value } => write!(
                f,
                "{}",
                ParamError::Fixed {
                    name: name.clone(),
                    value: value.clone()
                }
            ),
            AppError::Api(err) => write!(f, "{err}"),
            AppError::Chat(err) => write!(f, "{err}"),
            AppError::Config(err) => write!(f, "{err}"),
            AppError::Persistence(err) => write!(f, "{err}"),
            AppError::Attachment(err) => write!(f, "{err}"),
        }
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            AppError::Api(err) => Some(err),
            AppError::Chat(err) => Some(err),
            AppError::Config(err) => Some(err),
            AppError::Persistence(err) => Some(err),
            AppError::Attachment(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        AppError::Api(err)
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::MissingCredential => AppError::MissingCredential,
            other => AppError::Chat(other),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<PersistenceError> for AppError {
    fn from(err: PersistenceError) -> Self {
        AppError::Persistence(err)
    }
}

impl From<AttachmentError> for AppError {
    fn from(err: AttachmentError) -> Self {
        AppError::Attachment(err)
    }
}

impl From<ParamError> for AppError {
    fn from(err: ParamError) -> Self {
        match err {
            ParamError::Unknown(name) => AppError::UnknownParameter(name),
            ParamError::Fixed { name, value } => AppError::FixedParameter { name, value },
        }
    }
}

/// Everything resolved before the app is opened.
pub struct AppInit {
    pub paths: AppPaths,
    pub settings: Settings,
    /// Credential from the environment; used when the config has none.
    pub env_api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogSource {
    #[default]
    Live,
    /// The gateway could not be reached; the saved catalog is in use.
    Cached,
}

#[derive(Debug, Default)]
pub struct StartupReport {
    pub restored: Option<SessionId>,
    pub catalog_source: CatalogSource,
    /// A restored or saved selection that is no longer in the catalog.
    pub replaced_model: Option<String>,
}

pub struct App {
    gateway: Arc<dyn Gateway>,
    extractor: Box<dyn DocumentExtractor>,
    paths: AppPaths,
    settings: Settings,
    store: ChatStore,
    reconciler: ModelSwitchReconciler,
    restored: Option<SessionId>,
    pub config: AppConfig,
    pub catalog: ModelCatalog,
    pub session: SessionState,
}

impl App {
    /// Load configuration and restore the newest saved conversation.
    /// Nothing here touches the network.
    pub fn open(gateway: Arc<dyn Gateway>, init: AppInit) -> App {
        let AppInit {
            paths,
            settings,
            env_api_key,
        } = init;

        let mut config = AppConfig::load_or_bootstrap(&paths.config_file, env_api_key.clone());
        if config.api_key.trim().is_empty() {
            if let Some(key) = env_api_key.filter(|key| !key.trim().is_empty()) {
                config.api_key = key.trim().to_string();
            }
        }

        let store = ChatStore::new(&paths.chat_dir);
        let mut session = SessionState::default();
        let mut defaults = config.session_defaults(&settings);

        let restored = match store.latest() {
            Some((id, records)) => {
                let (header, messages) = split_header(records);
                if let Some(header) = header {
                    session.restore_header(&header);
                }
                info!(session = %id, messages = messages.len(), "restored latest chat");
                defaults.messages = messages;
                Some(id)
            }
            None => None,
        };
        session.initialize_defaults(defaults);

        App {
            gateway,
            extractor: Box::new(NoDocumentSupport),
            catalog: config.catalog(),
            paths,
            settings,
            store,
            reconciler: ModelSwitchReconciler::new(),
            restored,
            config,
            session,
        }
    }

    pub fn with_extractor(mut self, extractor: Box<dyn DocumentExtractor>) -> App {
        self.extractor = extractor;
        self
    }

    /// Require a credential, refresh the catalog (falling back to the saved
    /// one when the gateway is unreachable) and settle the selected model.
    pub async fn start(&mut self) -> Result<StartupReport, AppError> {
        self.ensure_credential()?;

        let catalog_source = match self.refresh_models().await {
            Ok(_) => CatalogSource::Live,
            Err(err @ (AppError::Api(_) | AppError::EmptyCatalog)) if !self.catalog.is_empty() => {
                warn!("using saved catalog: {err}");
                CatalogSource::Cached
            }
            Err(AppError::Api(_)) => return Err(AppError::EmptyCatalog),
            Err(err) => return Err(err),
        };

        let replaced_model = self.settle_selection();
        self.reconciler.track(&self.session.selected_model);

        Ok(StartupReport {
            restored: self.restored.clone(),
            catalog_source,
            replaced_model,
        })
    }

    pub fn ensure_credential(&self) -> Result<(), AppError> {
        if self.session.has_credential() {
            Ok(())
        } else {
            Err(AppError::MissingCredential)
        }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn reconciler(&self) -> &ModelSwitchReconciler {
        &self.reconciler
    }

    /// The view has been redrawn after a model switch.
    pub fn acknowledge_reload(&mut self) {
        self.reconciler.acknowledge_reload();
    }

    fn save_config(&self) {
        if let Err(err) = self.config.save_to_path(&self.paths.config_file) {
            warn!("could not save config: {err}");
        }
    }

    /// Replace the credential for this and future sessions.
    pub fn set_api_key(&mut self, api_key: &str) -> Result<(), AppError> {
        let api_key = api_key.trim().to_string();
        self.session.api_key = api_key.clone();
        self.config.api_key = api_key;
        self.config.save_to_path(&self.paths.config_file)?;
        Ok(())
    }

    /// Delete the configuration file and start over from the priced models
    /// of the live catalog. The new config is written on the next
    /// successful turn.
    pub fn reset_config(&mut self) -> Result<bool, AppError> {
        let existed = AppConfig::reset(&self.paths.config_file)?;
        self.config = AppConfig::from_catalog(self.session.api_key.clone(), &self.catalog);
        Ok(existed)
    }
}
