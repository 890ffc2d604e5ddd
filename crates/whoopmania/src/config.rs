//! Configuration management for whoopmania.
//!
//! Configuration is layered with figment: built-in defaults, then a TOML
//! file, then environment variables.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "whoopmania";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "whoopmania.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables prefixed with `WHOOPMANIA_`, sections separated
///    by a double underscore (`WHOOPMANIA_IMPORT__SKIP_HEATS=2`)
/// 2. TOML config file at `~/.config/whoopmania/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Export import configuration.
    pub import: ImportConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/whoopmania/whoopmania.db`
    pub database_path: Option<PathBuf>,
}

/// How heats in a timing export are matched to bracket race numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatNumbering {
    /// Heats are numbered 1.. in heat id order, after `skip_heats`.
    #[default]
    Sequential,
    /// The trailing number of the heat's display name is the race number.
    DisplayName,
}

/// Import-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Nickname given to leaderboard rows that carry no callsign.
    pub unknown_callsign: String,
    /// Heat numbering strategy for bracket imports.
    pub heat_numbering: HeatNumbering,
    /// Leading heats to ignore with sequential numbering (qualifying heats
    /// that share the export with the bracket).
    pub skip_heats: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            unknown_callsign: "Unknown".to_string(),
            heat_numbering: HeatNumbering::Sequential,
            skip_heats: 0,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// A missing file is not an error; defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("WHOOPMANIA_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.import.unknown_callsign.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "unknown_callsign must not be empty".to_string(),
            });
        }

        if self.import.heat_numbering == HeatNumbering::DisplayName && self.import.skip_heats > 0
        {
            return Err(Error::ConfigValidation {
                message: format!(
                    "skip_heats ({}) only applies to sequential heat numbering",
                    self.import.skip_heats
                ),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}
