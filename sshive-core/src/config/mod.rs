//! Configuration management for `SSHive`
//!
//! This module provides the `ConfigManager` for loading and saving the
//! launcher settings in TOML format.

mod manager;
pub mod settings;

pub use manager::ConfigManager;
pub use settings::{AppSettings, LaunchSettings, TerminalSettings};
