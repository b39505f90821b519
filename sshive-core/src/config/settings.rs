//! Application settings model
//!
//! This module defines the launcher settings stored in config.toml.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application-wide settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Launch behaviour
    #[serde(default)]
    pub launch: LaunchSettings,
    /// Terminal selection
    #[serde(default)]
    pub terminal: TerminalSettings,
}

/// Settings controlling a launch attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSettings {
    /// Probe credentials before opening a terminal
    #[serde(default = "default_true")]
    pub verify_credentials: bool,
    /// Upper bound for the whole credential probe, in seconds
    #[serde(default = "default_preflight_timeout")]
    pub preflight_timeout_secs: u64,
    /// TCP connect timeout handed to the client, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Upper bound for PPK conversion, in seconds
    #[serde(default = "default_conversion_timeout")]
    pub conversion_timeout_secs: u64,
    /// How long a converted key is kept after the terminal starts, in milliseconds
    #[serde(default = "default_key_handoff_grace")]
    pub key_handoff_grace_ms: u64,
    /// Keep the window open with a prompt when the session fails
    #[serde(default = "default_true")]
    pub hold_window_on_failure: bool,
    /// Directory for converted keys (system temp dir if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
}

const fn default_true() -> bool {
    true
}

const fn default_preflight_timeout() -> u64 {
    8
}

const fn default_connect_timeout() -> u64 {
    3
}

const fn default_conversion_timeout() -> u64 {
    10
}

const fn default_key_handoff_grace() -> u64 {
    5000
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            verify_credentials: default_true(),
            preflight_timeout_secs: default_preflight_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            conversion_timeout_secs: default_conversion_timeout(),
            key_handoff_grace_ms: default_key_handoff_grace(),
            hold_window_on_failure: default_true(),
            temp_dir: None,
        }
    }
}

impl LaunchSettings {
    /// Credential probe bound
    #[must_use]
    pub const fn preflight_timeout(&self) -> Duration {
        Duration::from_secs(self.preflight_timeout_secs)
    }

    /// Client connect timeout
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// PPK conversion bound
    #[must_use]
    pub const fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.conversion_timeout_secs)
    }

    /// Converted key hand-off grace
    #[must_use]
    pub const fn key_handoff_grace(&self) -> Duration {
        Duration::from_millis(self.key_handoff_grace_ms)
    }
}

/// Terminal selection settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSettings {
    /// Terminal name or executable tried before the platform ranking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred: Option<String>,
}
