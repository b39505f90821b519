//! `SSHive` Core Library
//!
//! This crate provides the connection launch subsystem for the `SSHive`
//! connection manager: the connection model, authentication resolution,
//! PPK key conversion, terminal detection, command construction, credential
//! pre-flight checks and the launch orchestrator.

pub mod auth;
pub mod command;
pub mod config;
pub mod error;
pub mod launch;
pub mod models;
pub mod platform;
pub mod preflight;
pub mod terminal;
pub mod tools;

pub use auth::{AuthPlan, AuthResolver, ClientKind, KeyMaterializer, MaterializedKey};
pub use command::{CommandBuilder, LaunchCommand};
pub use config::{AppSettings, ConfigManager, LaunchSettings, TerminalSettings};
pub use error::{
    ConfigError, ConfigResult, CredentialError, CredentialResult, ErrorKind, LaunchError,
    LaunchResult, Result, SshiveError,
};
pub use launch::{
    DetachedSpawner, LaunchFailure, LaunchOptions, LaunchOrchestrator, LaunchOutcome,
    LaunchReport, LaunchStage, Spawner,
};
pub use models::{AuthMethod, Connection, GroupPath, GroupTree};
pub use platform::Platform;
pub use preflight::{Preflight, PreflightValidator};
pub use terminal::{DetectedTerminal, TerminalDetector, TerminalProfile, WindowTemplate};
pub use tools::{SystemToolLocator, ToolInfo, ToolLocator, ToolReport, ToolRole, ToolSet};

/// Re-exported so callers can cancel launches without depending on
/// `tokio-util` directly
pub use tokio_util::sync::CancellationToken;
