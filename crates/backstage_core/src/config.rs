//! Process configuration sourced from environment variables.
//!
//! An optional `.env` file in the working directory is loaded first; real
//! environment variables win over it.

use crate::auth::oauth::OAuthStrategyConfig;
use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "BACKSTAGE_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "BACKSTAGE_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "BACKSTAGE_LOG_DIR";
pub const DEFAULT_DB_PATH: &str = "backstage.sqlite3";

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration loading errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required variable is not set.
    Missing(&'static str),
    /// Required variable is set but blank.
    Empty(&'static str),
    /// Variable value cannot be used.
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "environment variable `{name}` is not set"),
            Self::Empty(name) => write!(f, "environment variable `{name}` is empty"),
            Self::Invalid {
                name,
                value,
                reason,
            } => write!(
                f,
                "environment variable `{name}` has invalid value `{value}`: {reason}"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    /// Present only when every OAuth variable is set.
    pub oauth: Option<OAuthStrategyConfig>,
}

impl AppConfig {
    /// Loads `.env` (if any) and reads the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        load_dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let db_path = optional(&lookup, DB_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let log_level = match optional(&lookup, LOG_LEVEL_VAR) {
            Some(level) => normalize_level(&level)
                .map_err(|err| ConfigError::Invalid {
                    name: LOG_LEVEL_VAR,
                    value: level.clone(),
                    reason: err.to_string(),
                })?
                .to_string(),
            None => default_log_level().to_string(),
        };

        let log_dir = optional(&lookup, LOG_DIR_VAR).map(PathBuf::from);

        let oauth = match OAuthStrategyConfig::from_lookup(&lookup) {
            Ok(config) => Some(config),
            Err(ConfigError::Missing(_) | ConfigError::Empty(_)) => None,
            Err(err) => return Err(err),
        };

        Ok(Self {
            db_path,
            log_level,
            log_dir,
            oauth,
        })
    }
}

/// Loads `.env` from the working directory if present.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        log::debug!(
            "event=config_dotenv module=config status=ok path={}",
            path.display()
        );
    }
}

/// Reads a required, non-blank variable.
pub(crate) fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> ConfigResult<String> {
    let value = lookup(name).ok_or(ConfigError::Missing(name))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Empty(name));
    }
    Ok(trimmed.to_string())
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &'static str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
