//! Error types for `SSHive`
//!
//! This module defines all error types used by the launch subsystem:
//! credential problems, launch failures, and settings file errors.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::AuthMethod;

/// Top-level error type for `SSHive` operations
#[derive(Debug, Error)]
pub enum SshiveError {
    /// Credential-related errors (keys, helpers, preflight)
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Terminal and process launch errors
    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to authentication material and credential checks
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Key file is missing or unreadable
    #[error("SSH key file not found or unreadable: {}", .0.display())]
    KeyNotFound(PathBuf),

    /// Key-format converter is not installed
    #[error("Key converter '{0}' not found; install PuTTY tools to use PPK keys")]
    ConverterMissing(String),

    /// Key conversion failed or timed out
    #[error("Failed to convert PPK key: {0}")]
    ConversionFailed(String),

    /// Password-capable helper is not installed
    #[error("Password authentication requires {0} to be installed")]
    PasswordHelperMissing(String),

    /// The server rejected the supplied credentials
    #[error("Authentication failed: {0}")]
    AuthRejected(String),

    /// The host could not be reached
    #[error("Host unreachable: {0}")]
    Unreachable(String),

    /// The credential check did not finish in time
    #[error("Authentication check timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Errors related to terminal detection and process launch
#[derive(Debug, Error)]
pub enum LaunchError {
    /// No supported terminal emulator is installed
    #[error("No terminal emulator found (tried: {0})")]
    NoTerminalFound(String),

    /// The method cannot be delivered through the detected terminal
    #[error("{method} authentication is not supported with {terminal}")]
    UnsupportedCombination {
        /// The authentication method requested
        method: AuthMethod,
        /// The detected terminal emulator
        terminal: String,
    },

    /// The terminal process could not be created
    #[error("Failed to spawn terminal: {0}")]
    SpawnFailed(String),

    /// The remote-login client is not installed
    #[error("SSH client '{0}' not found in PATH")]
    ClientMissing(String),

    /// Connection record is inconsistent
    #[error("Invalid connection: {0}")]
    InvalidConnection(String),

    /// Another attempt for the same connection is still running
    #[error("A launch for connection {0} is already in progress")]
    AlreadyInProgress(Uuid),

    /// The attempt was cancelled before the terminal was spawned
    #[error("Launch cancelled")]
    Cancelled,
}

/// Errors related to configuration file operations
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration file
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {reason}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// The reason for validation failure
        reason: String,
    },

    /// Configuration file not found
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Failed to write configuration file
    #[error("Failed to write configuration: {0}")]
    Write(String),

    /// Failed to serialize configuration
    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),

    /// Failed to deserialize configuration
    #[error("Failed to deserialize configuration: {0}")]
    Deserialize(String),
}

/// Flat classification of launch failures for presentation layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`CredentialError::KeyNotFound`]
    KeyNotFound,
    /// See [`CredentialError::ConverterMissing`]
    ConverterMissing,
    /// See [`CredentialError::ConversionFailed`]
    ConversionFailed,
    /// See [`CredentialError::PasswordHelperMissing`]
    PasswordHelperMissing,
    /// See [`CredentialError::AuthRejected`]
    AuthRejected,
    /// See [`CredentialError::Unreachable`]
    Unreachable,
    /// See [`CredentialError::Timeout`]
    Timeout,
    /// See [`LaunchError::NoTerminalFound`]
    NoTerminalFound,
    /// See [`LaunchError::UnsupportedCombination`]
    UnsupportedCombination,
    /// See [`LaunchError::SpawnFailed`]
    SpawnFailed,
    /// See [`LaunchError::ClientMissing`]
    ClientMissing,
    /// See [`LaunchError::InvalidConnection`]
    InvalidConnection,
    /// See [`LaunchError::AlreadyInProgress`]
    AlreadyInProgress,
    /// See [`LaunchError::Cancelled`]
    Cancelled,
    /// Settings or I/O problem outside the launch taxonomy
    Internal,
}

impl ErrorKind {
    /// Returns true for preflight outcomes the user may choose to ignore
    ///
    /// A rejected credential is never overridable; an unreachable host or a
    /// timed-out check is ambiguous and may be launched anyway.
    #[must_use]
    pub const fn is_overridable(self) -> bool {
        matches!(self, Self::Unreachable | Self::Timeout)
    }

    /// Returns true if the failure came from the preflight probe
    #[must_use]
    pub const fn is_preflight(self) -> bool {
        matches!(self, Self::AuthRejected | Self::Unreachable | Self::Timeout)
    }
}

impl From<&CredentialError> for ErrorKind {
    fn from(err: &CredentialError) -> Self {
        match err {
            CredentialError::KeyNotFound(_) => Self::KeyNotFound,
            CredentialError::ConverterMissing(_) => Self::ConverterMissing,
            CredentialError::ConversionFailed(_) => Self::ConversionFailed,
            CredentialError::PasswordHelperMissing(_) => Self::PasswordHelperMissing,
            CredentialError::AuthRejected(_) => Self::AuthRejected,
            CredentialError::Unreachable(_) => Self::Unreachable,
            CredentialError::Timeout(_) => Self::Timeout,
        }
    }
}

impl From<&LaunchError> for ErrorKind {
    fn from(err: &LaunchError) -> Self {
        match err {
            LaunchError::NoTerminalFound(_) => Self::NoTerminalFound,
            LaunchError::UnsupportedCombination { .. } => Self::UnsupportedCombination,
            LaunchError::SpawnFailed(_) => Self::SpawnFailed,
            LaunchError::ClientMissing(_) => Self::ClientMissing,
            LaunchError::InvalidConnection(_) => Self::InvalidConnection,
            LaunchError::AlreadyInProgress(_) => Self::AlreadyInProgress,
            LaunchError::Cancelled => Self::Cancelled,
        }
    }
}

impl From<&SshiveError> for ErrorKind {
    fn from(err: &SshiveError) -> Self {
        match err {
            SshiveError::Credential(e) => e.into(),
            SshiveError::Launch(e) => e.into(),
            SshiveError::Config(_) | SshiveError::Io(_) => Self::Internal,
        }
    }
}

/// Result type alias for `SSHive` operations
pub type Result<T> = std::result::Result<T, SshiveError>;

/// Result type alias for credential operations
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Result type alias for launch operations
pub type LaunchResult<T> = std::result::Result<T, LaunchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
