use crate::core::config::data::{path_display, AppConfig, Settings};
use crate::core::constants::CHAT_HISTORY_DIR;
use directories::ProjectDirs;
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

const CONFIG_FILE: &str = "config.json";
const SETTINGS_FILE: &str = "settings.toml";

/// Errors that can occur when loading or saving configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk.
    Read { path: PathBuf, source: io::Error },

    /// The JSON configuration file is malformed.
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The TOML settings file is malformed.
    ParseSettings {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Failed to write or replace a configuration file.
    Write { path: PathBuf, source: io::Error },

    /// The configuration could not be encoded.
    Encode(String),

    /// The platform has no home/config directory and none was given.
    NoConfigDir,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {}", path_display(path), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse config at {}: {}", path_display(path), source)
            }
            ConfigError::ParseSettings { path, source } => {
                write!(f, "Failed to parse settings at {}: {}", path_display(path), source)
            }
            ConfigError::Write { path, source } => {
                write!(f, "Failed to write config at {}: {}", path_display(path), source)
            }
            ConfigError::Encode(detail) => write!(f, "Failed to encode config: {detail}"),
            ConfigError::NoConfigDir => write!(
                f,
                "Could not determine a configuration directory; pass --data-dir"
            ),
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::ParseSettings { source, .. } => Some(source),
            ConfigError::Write { source, .. } => Some(source),
            ConfigError::Encode(_) | ConfigError::NoConfigDir => None,
        }
    }
}

/// Where configuration and chat history live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_file: PathBuf,
    pub settings_file: PathBuf,
    pub chat_dir: PathBuf,
}

impl AppPaths {
    /// Everything under `data_dir` when given, otherwise the platform
    /// config and data directories.
    pub fn resolve(data_dir: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(dir) = data_dir {
            return Ok(Self::under(dir));
        }
        let proj_dirs =
            ProjectDirs::from("org", "routechat", "routechat").ok_or(ConfigError::NoConfigDir)?;
        let config_dir = proj_dirs.config_dir();
        Ok(Self {
            config_file: config_dir.join(CONFIG_FILE),
            settings_file: config_dir.join(SETTINGS_FILE),
            chat_dir: proj_dirs.data_dir().join(CHAT_HISTORY_DIR),
        })
    }

    pub fn under(dir: &Path) -> Self {
        Self {
            config_file: dir.join(CONFIG_FILE),
            settings_file: dir.join(SETTINGS_FILE),
            chat_dir: dir.join(CHAT_HISTORY_DIR),
        }
    }

    pub fn with_chat_dir(mut self, chat_dir: Option<&Path>) -> Self {
        if let Some(dir) = chat_dir {
            self.chat_dir = dir.to_path_buf();
        }
        self
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    let parent = path.parent().filter(|dir| !dir.as_os_str().is_empty());

    if let Some(dir) = parent {
        fs::create_dir_all(dir).map_err(write_err)?;
    }

    let mut temp_file = match parent {
        Some(dir) => NamedTempFile::new_in(dir),
        None => NamedTempFile::new(),
    }
    .map_err(write_err)?;

    temp_file.write_all(contents).map_err(write_err)?;
    temp_file.as_file_mut().sync_all().map_err(write_err)?;
    temp_file
        .persist(path)
        .map_err(|err| write_err(err.error))?;
    Ok(())
}

fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>, ConfigError> {
    serde_json::to_vec_pretty(value).map_err(|err| ConfigError::Encode(err.to_string()))
}

impl AppConfig {
    /// `Ok(None)` when the file does not exist.
    pub fn load_from_path(config_path: &Path) -> Result<Option<AppConfig>, ConfigError> {
        let Some(contents) = read_optional(config_path)? else {
            return Ok(None);
        };
        let config = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })?;
        Ok(Some(config))
    }

    pub fn save_to_path(&self, config_path: &Path) -> Result<(), ConfigError> {
        write_atomically(config_path, &encode_json(self)?)
    }

    /// Load the configuration, regenerating defaults when the file is missing
    /// or unreadable. Regenerated defaults are written back; a failed write
    /// is logged and the in-memory defaults are still returned.
    pub fn load_or_bootstrap(config_path: &Path, env_api_key: Option<String>) -> AppConfig {
        match AppConfig::load_from_path(config_path) {
            Ok(Some(config)) => return config,
            Ok(None) => info!(
                "no config at {}, generating defaults",
                path_display(config_path)
            ),
            Err(err) => warn!("{err}; regenerating defaults"),
        }

        let config = AppConfig::bootstrap(env_api_key);
        if let Err(err) = config.save_to_path(config_path) {
            warn!("could not write default config: {err}");
        }
        config
    }

    /// Delete the configuration file. Returns whether one existed.
    pub fn reset(config_path: &Path) -> Result<bool, ConfigError> {
        match fs::remove_file(config_path) {
            Ok(()) => Ok(true),
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ConfigError::Write {
                path: config_path.to_path_buf(),
                source,
            }),
        }
    }
}

impl Settings {
    /// Missing file means defaults; a malformed file is an error.
    pub fn load_from_path(settings_path: &Path) -> Result<Settings, ConfigError> {
        let Some(contents) = read_optional(settings_path)? else {
            return Ok(Settings::default());
        };
        toml::from_str(&contents).map_err(|source| ConfigError::ParseSettings {
            path: settings_path.to_path_buf(),
            source,
        })
    }
}
