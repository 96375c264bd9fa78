//! # gb-configs
//!
//! Layered settings: built-in defaults, then an optional `galatea-blog.toml`,
//! then `GALATEA_BLOG__*` environment variables (`__` separates sections,
//! e.g. `GALATEA_BLOG__DATABASE__URL`). A `.env` file is read first.

use std::path::PathBuf;

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const ENV_PREFIX: &str = "GALATEA_BLOG";
pub const DEFAULT_CONFIG_FILE: &str = "galatea-blog";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub storage: StorageSettings,
    pub i18n: I18nSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// `sqlite://...`, or `sqlite::memory:` for a throwaway database
    pub url: SecretString,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Root of durable file storage
    pub root: PathBuf,
    /// Thumbnails go under `<root>/<database_name>/galatea/blog`
    pub database_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct I18nSettings {
    /// Language whose values are the base values of translatable fields
    pub default_language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    /// `text` or `json`
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl Settings {
    /// Loads `.env`, then the layered sources.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        Self::load_from(Some(DEFAULT_CONFIG_FILE))
    }

    /// Layered load without touching `.env`; `file` is optional on disk.
    pub fn load_from(file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("database.url", "sqlite://galatea-blog.db")?
            .set_default("storage.root", "./data")?
            .set_default("storage.database_name", "galatea")?
            .set_default("i18n.default_language", "en")?
            .set_default("log.level", "info")?
            .set_default("log.format", "text")?;

        if let Some(file) = file {
            builder = builder.add_source(File::with_name(file).required(false));
        }

        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.i18n.default_language.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "i18n.default_language",
                reason: "must not be empty".into(),
            });
        }
        if self.storage.database_name.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                key: "storage.database_name",
                reason: "must be a single path segment".into(),
            });
        }
        Ok(())
    }
}
