//! Runtime configuration for the census core.
//!
//! Load order: TOML file (optional) → `CENSUS_PROFILE` environment variable →
//! defaults.
//!
//! # Invariants
//! - Each profile owns a distinct database file inside `data_dir`.
//! - Missing keys fall back to defaults; unknown keys are rejected.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configured profile.
pub const PROFILE_ENV_VAR: &str = "CENSUS_PROFILE";

/// Deployment profile; selects the database file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Development,
    Testing,
    Production,
}

impl Profile {
    /// Database file name used by this profile.
    pub fn database_file_name(self) -> &'static str {
        match self {
            Self::Development => "data-dev.sqlite",
            Self::Testing => "data-test.sqlite",
            Self::Production => "data.sqlite",
        }
    }

    /// Parses a profile name. `default` is an alias for development.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "default" => Some(Self::Development),
            "testing" => Some(Self::Testing),
            "production" => Some(Self::Production),
            _ => None,
        }
    }
}

/// Top-level core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub profile: Profile,
    /// Directory holding the profile database files.
    pub data_dir: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            data_dir: PathBuf::from("."),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    UnknownProfile(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::UnknownProfile(value) => write!(
                f,
                "unknown profile `{value}`; expected development|testing|production"
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::UnknownProfile(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

impl CoreConfig {
    /// Parses configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads configuration from an optional file, then applies the
    /// `CENSUS_PROFILE` override.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };

        if let Ok(value) = std::env::var(PROFILE_ENV_VAR) {
            config.apply_profile_override(&value)?;
        }

        Ok(config)
    }

    /// Replaces the profile with a named one.
    pub fn apply_profile_override(&mut self, value: &str) -> Result<(), ConfigError> {
        self.profile =
            Profile::parse(value).ok_or_else(|| ConfigError::UnknownProfile(value.to_string()))?;
        Ok(())
    }

    /// Full path of the profile database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(self.profile.database_file_name())
    }
}
