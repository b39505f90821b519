//! Connection model representing a saved remote-login target.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{ConfigError, ConfigResult};

use super::group::GroupPath;

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

const fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

/// Authentication method stated by a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// No credential material; the client decides (agent, default keys, prompt)
    #[default]
    None,
    /// OpenSSH-format private key file
    SshKey,
    /// PuTTY-format private key file
    PpkKey,
    /// Password supplied through a helper
    Password,
}

impl AuthMethod {
    /// Returns the method identifier as used in settings and CLI flags
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SshKey => "ssh_key",
            Self::PpkKey => "ppk_key",
            Self::Password => "password",
        }
    }

    /// Returns true if the method needs a key file
    #[must_use]
    pub const fn uses_key_file(&self) -> bool {
        matches!(self, Self::SshKey | Self::PpkKey)
    }

    /// Picks the key method for a key file based on its extension
    ///
    /// `.ppk` (any case) selects [`AuthMethod::PpkKey`], everything else
    /// [`AuthMethod::SshKey`].
    #[must_use]
    pub fn for_key_path(path: &Path) -> Self {
        let is_ppk = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ppk"));
        if is_ppk {
            Self::PpkKey
        } else {
            Self::SshKey
        }
    }
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "No credential"),
            Self::SshKey => write!(f, "SSH key"),
            Self::PpkKey => write!(f, "PPK key"),
            Self::Password => write!(f, "Password"),
        }
    }
}

/// A saved remote-login target
///
/// The record is owned by the storage layer; the launch subsystem only reads
/// it. The password is held as a `SecretString` and is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Unique identifier for the connection
    pub id: Uuid,
    /// Human-readable name for the connection
    pub name: String,
    /// Remote host address (hostname or IP)
    pub host: String,
    /// Remote port number
    #[serde(default = "default_port")]
    pub port: u16,
    /// Remote login name
    pub user: String,
    /// Group path for hierarchical organisation (empty means ungrouped)
    #[serde(default, skip_serializing_if = "GroupPath::is_empty")]
    pub group_path: GroupPath,
    /// Authentication method
    #[serde(default)]
    pub auth_method: AuthMethod,
    /// Path to the private key file for key methods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,
    /// Password for password authentication (runtime only)
    #[serde(skip)]
    pub password: Option<SecretString>,
    /// Presentation icon reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_ref: Option<String>,
}

impl Connection {
    /// Creates a new connection on the default port with no credential
    #[must_use]
    pub fn new(name: impl Into<String>, host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            user: user.into(),
            group_path: GroupPath::default(),
            auth_method: AuthMethod::None,
            key_path: None,
            password: None,
            icon_ref: None,
        }
    }

    /// Sets the port for this connection
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the group path for this connection
    pub fn with_group_path(mut self, group_path: GroupPath) -> Self {
        self.group_path = group_path;
        self
    }

    /// Uses a key file, choosing the key method from the file extension
    ///
    /// A leading `~` is expanded to the home directory.
    pub fn with_key(mut self, key_path: impl AsRef<Path>) -> Self {
        let key_path = expand_key_path(key_path.as_ref());
        self.auth_method = AuthMethod::for_key_path(&key_path);
        self.key_path = Some(key_path);
        self.password = None;
        self
    }

    /// Uses a PuTTY-format key file regardless of its extension
    pub fn with_ppk_key(mut self, key_path: impl AsRef<Path>) -> Self {
        self.key_path = Some(expand_key_path(key_path.as_ref()));
        self.auth_method = AuthMethod::PpkKey;
        self.password = None;
        self
    }

    /// Uses password authentication
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self.auth_method = AuthMethod::Password;
        self.key_path = None;
        self
    }

    /// Sets the presentation icon reference
    pub fn with_icon(mut self, icon_ref: impl Into<String>) -> Self {
        self.icon_ref = Some(icon_ref.into());
        self
    }

    /// Returns `user@host`
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Exposes the password for use (should be used carefully)
    #[must_use]
    pub fn expose_password(&self) -> Option<&str> {
        self.password.as_ref().map(ExposeSecret::expose_secret)
    }

    /// Validates the connection record
    ///
    /// Checks that required fields are present and that the credential
    /// material matches the authentication method exactly.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(validation("name", "Connection name cannot be empty"));
        }
        if self.host.trim().is_empty() {
            return Err(validation("host", "Host cannot be empty"));
        }
        if self.user.trim().is_empty() {
            return Err(validation("user", "User cannot be empty"));
        }
        if self.port == 0 {
            return Err(validation("port", "Port must be between 1 and 65535"));
        }

        let has_key = self
            .key_path
            .as_ref()
            .is_some_and(|p| !p.as_os_str().is_empty());
        let has_password = self.password.is_some();

        match self.auth_method {
            AuthMethod::None if has_key || has_password => Err(validation(
                "auth_method",
                "Credential material given but authentication method is none",
            )),
            AuthMethod::SshKey | AuthMethod::PpkKey if !has_key => Err(validation(
                "key_path",
                format!("{} authentication requires a key file", self.auth_method),
            )),
            AuthMethod::SshKey | AuthMethod::PpkKey if has_password => Err(validation(
                "password",
                "Password given for key authentication",
            )),
            AuthMethod::Password if !has_password => Err(validation(
                "password",
                "Password authentication requires a password",
            )),
            AuthMethod::Password if has_key => Err(validation(
                "key_path",
                "Key file given for password authentication",
            )),
            _ => Ok(()),
        }
    }
}

// Manual PartialEq implementation since SecretString doesn't implement it
impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.host == other.host
            && self.port == other.port
            && self.user == other.user
            && self.group_path == other.group_path
            && self.auth_method == other.auth_method
            && self.key_path == other.key_path
            && self.expose_password() == other.expose_password()
            && self.icon_ref == other.icon_ref
    }
}

impl Eq for Connection {}

impl std::fmt::Display for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}@{}:{})", self.name, self.user, self.host, self.port)
    }
}

fn validation(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn expand_key_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}
