//! Configuration manager for TOML file operations
//!
//! This module provides the `ConfigManager` which handles loading, saving and
//! validating the launcher settings file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

use super::settings::AppSettings;

/// Application directory name under the user config directory
const APP_DIR: &str = "sshive";
const CONFIG_FILE: &str = "config.toml";

/// Configuration manager for `SSHive`
///
/// Settings are stored in `~/.config/sshive/config.toml` by default.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// Base directory for configuration files
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a new `ConfigManager` with the default configuration directory
    ///
    /// # Errors
    ///
    /// Returns an error if the user config directory cannot be determined.
    pub fn new() -> ConfigResult<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound(PathBuf::from("~/.config")))?
            .join(APP_DIR);
        Ok(Self { config_dir })
    }

    /// Creates a new `ConfigManager` with a custom configuration directory
    #[must_use]
    pub const fn with_config_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Returns the configuration directory path
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Returns the settings file path
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Ensures the configuration directory exists
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn ensure_config_dir(&self) -> ConfigResult<()> {
        if !self.config_dir.exists() {
            fs::create_dir_all(&self.config_dir).map_err(|e| {
                ConfigError::Write(format!(
                    "Failed to create config directory {}: {}",
                    self.config_dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Loads the settings, returning defaults if the file doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed or holds
    /// invalid values.
    pub fn load_settings(&self) -> ConfigResult<AppSettings> {
        let settings: AppSettings = Self::load_toml_file(&self.settings_path())?;
        Self::validate_settings(&settings)?;
        Ok(settings)
    }

    /// Saves the settings, creating the configuration directory if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or the file cannot be
    /// written.
    pub fn save_settings(&self, settings: &AppSettings) -> ConfigResult<()> {
        Self::validate_settings(settings)?;
        self.ensure_config_dir()?;
        Self::save_toml_file(&self.settings_path(), settings)
    }

    /// Validates settings values
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the offending field.
    pub fn validate_settings(settings: &AppSettings) -> ConfigResult<()> {
        let launch = &settings.launch;
        for (field, value) in [
            ("launch.preflight_timeout_secs", launch.preflight_timeout_secs),
            ("launch.connect_timeout_secs", launch.connect_timeout_secs),
            ("launch.conversion_timeout_secs", launch.conversion_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation {
                    field: field.to_string(),
                    reason: "Timeout must be greater than zero".to_string(),
                });
            }
        }

        if launch.connect_timeout_secs >= launch.preflight_timeout_secs {
            return Err(ConfigError::Validation {
                field: "launch.connect_timeout_secs".to_string(),
                reason: format!(
                    "Connect timeout must be shorter than the preflight timeout ({}s)",
                    launch.preflight_timeout_secs
                ),
            });
        }

        if let Some(dir) = &launch.temp_dir {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::Validation {
                    field: "launch.temp_dir".to_string(),
                    reason: "Temporary directory cannot be empty".to_string(),
                });
            }
        }

        if settings
            .terminal
            .preferred
            .as_ref()
            .is_some_and(|p| p.trim().is_empty())
        {
            return Err(ConfigError::Validation {
                field: "terminal.preferred".to_string(),
                reason: "Preferred terminal cannot be blank".to_string(),
            });
        }

        Ok(())
    }

    // ========== Generic TOML Operations ==========

    /// Loads and parses a TOML file
    ///
    /// Returns the default value if the file doesn't exist.
    fn load_toml_file<T>(path: &Path) -> ConfigResult<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        if !path.exists() {
            return Ok(T::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read {}: {}", path.display(), e)))?;

        toml::from_str(&content).map_err(|e| {
            ConfigError::Deserialize(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Saves data to a TOML file
    fn save_toml_file<T>(path: &Path, data: &T) -> ConfigResult<()>
    where
        T: serde::Serialize,
    {
        let content = toml::to_string_pretty(data)
            .map_err(|e| ConfigError::Serialize(format!("Failed to serialize: {e}")))?;

        fs::write(path, content)
            .map_err(|e| ConfigError::Write(format!("Failed to write {}: {}", path.display(), e)))
    }
}
