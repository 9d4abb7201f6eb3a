//! Layered settings: an optional file, then `REVIEWWARE__*` environment
//! variables on top.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_CONFIG_FILE: &str = "reviewware";
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 3000;

#[derive(Debug, Error)]
#[error("Config error: {context}: {source}")]
pub struct ConfigError {
    context: &'static str,
    #[source]
    source: config::ConfigError,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Shows the reason behind a rejected submission instead of an opaque 400.
    pub debug: bool,
    pub log_level: Option<String>,
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub reviews: ReviewSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub address: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 3004,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "reviewware.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReviewSettings {
    pub max_content_length: usize,
    pub allow_profanities: bool,
    pub banned_words: Vec<String>,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            allow_profanities: false,
            banned_words: Vec::new(),
        }
    }
}

/// Loads settings from `path` (default `reviewware.toml`, optional) and the
/// environment, e.g. `REVIEWWARE__REVIEWS__ALLOW_PROFANITIES=true`.
/// `REVIEWWARE__REVIEWS__BANNED_WORDS` takes a comma-separated list.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let file = path.map_or_else(
        || File::with_name(DEFAULT_CONFIG_FILE).required(false),
        |p| File::from(p).required(true),
    );

    let builder = Config::builder().add_source(file).add_source(
        Environment::with_prefix("REVIEWWARE")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("reviews.banned_words")
            .try_parsing(true),
    );

    match path {
        Some(p) => info!("Loading config from {}", p.display()),
        None => info!("Loading config from {DEFAULT_CONFIG_FILE} (if present)"),
    }

    builder
        .build()
        .map_err(|source| ConfigError {
            context: "Failed to build config",
            source,
        })?
        .try_deserialize()
        .map_err(|source| ConfigError {
            context: "Failed to deserialize config",
            source,
        })
}
