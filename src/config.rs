//! Run configuration loaded from TOML
//!
//! ```toml
//! [sizing]
//! defaultVarchar = 60
//! longTextFields = ["ementa", "decisao"]
//!
//! [staging]
//! table = "judged"
//! batchSize = 500
//! ```
//!
//! Missing tables and keys keep their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::inference::SizingConfig;
use crate::staging::StagingConfig;

/// Errors that can occur while loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config file {path}: {error}")]
    Read { path: PathBuf, error: String },

    /// File is not valid TOML or has wrong value types
    #[error("Failed to parse config file {path}: {error}")]
    Parse { path: PathBuf, error: String },

    /// Values parse but cannot be used
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::Read { path, error } => format!(
                "Could not read config file {}: {error}\n\nHint: Check the --config path.",
                path.display()
            ),
            ConfigError::Parse { path, error } => format!(
                "Config file {} is invalid:\n{error}\n\n\
                Hint: Keys are camelCase under [sizing] and [staging] tables.",
                path.display()
            ),
            ConfigError::Invalid(msg) => format!("Invalid configuration: {msg}"),
        }
    }
}

/// Sizing and staging settings for a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub sizing: SizingConfig,
    pub staging: StagingConfig,
}

impl EtlConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: EtlConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Check values serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sizing.safety_margin < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "safetyMargin must be at least 1.0, got {}",
                self.sizing.safety_margin
            )));
        }
        if self.sizing.file_extension.is_empty() {
            return Err(ConfigError::Invalid("fileExtension is empty".to_string()));
        }
        self.staging
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
