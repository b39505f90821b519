//! Authentication method resolution.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{CredentialError, LaunchError, Result};
use crate::models::{AuthMethod, Connection};
use crate::platform::Platform;
use crate::tools::ToolLocator;

const OPENSSH_CLIENT: &str = "ssh";
const PUTTY_CLIENTS: &[&str] = &["plink", "klink"];
const KEY_CONVERTER: &str = "puttygen";
const PASSWORD_HELPER: &str = "sshpass";

/// Family of the remote-login client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientKind {
    /// OpenSSH `ssh`
    OpenSsh,
    /// PuTTY-family `plink` / `klink`
    Plink,
}

/// An executable found on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    /// Executable name as looked up
    pub name: String,
    /// Absolute path
    pub path: PathBuf,
}

impl ResolvedTool {
    fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

/// Concrete authentication plan for one launch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPlan {
    /// Resolved method
    pub method: AuthMethod,
    /// Platform the plan was resolved for
    pub platform: Platform,
    /// Client family
    pub client_kind: ClientKind,
    /// Remote-login client program
    pub client: ResolvedTool,
    /// Source key path (key methods)
    pub key_path: Option<PathBuf>,
    /// Key file the client will read; set by the materializer
    pub materialized_key_path: Option<PathBuf>,
    /// Password-capable helper, when one is needed
    pub password_helper: Option<ResolvedTool>,
    /// Key converter, when the client cannot read the key format
    pub converter: Option<ResolvedTool>,
}

impl AuthPlan {
    /// Returns true if the password goes through a helper program
    #[must_use]
    pub const fn requires_helper(&self) -> bool {
        self.password_helper.is_some()
    }

    /// Returns true if the key must be converted before use
    #[must_use]
    pub const fn requires_conversion(&self) -> bool {
        self.converter.is_some()
    }

    /// Key file to hand to the client
    #[must_use]
    pub fn identity_path(&self) -> Option<&Path> {
        self.materialized_key_path.as_deref()
    }
}

/// Decides the concrete authentication method and checks required tooling
pub struct AuthResolver {
    platform: Platform,
    locator: Arc<dyn ToolLocator>,
}

impl AuthResolver {
    /// Creates a resolver for `platform`
    #[must_use]
    pub fn new(platform: Platform, locator: Arc<dyn ToolLocator>) -> Self {
        Self { platform, locator }
    }

    /// Resolves the authentication plan for a connection
    ///
    /// # Errors
    ///
    /// - [`LaunchError::InvalidConnection`] if the record is inconsistent
    /// - [`LaunchError::ClientMissing`] if no usable client is installed
    /// - [`CredentialError::KeyNotFound`] if the key file cannot be read
    /// - [`CredentialError::ConverterMissing`] for PPK keys without `puttygen`
    /// - [`CredentialError::PasswordHelperMissing`] for passwords without a helper
    pub fn resolve(&self, connection: &Connection) -> Result<AuthPlan> {
        connection
            .validate()
            .map_err(|e| LaunchError::InvalidConnection(e.to_string()))?;

        let method = connection.auth_method;
        let key_path = if method.uses_key_file() {
            let path = connection
                .key_path
                .clone()
                .ok_or_else(|| LaunchError::InvalidConnection("missing key path".to_string()))?;
            check_key_readable(&path)?;
            Some(path)
        } else {
            None
        };

        let plan = if self.platform == Platform::Windows
            && matches!(method, AuthMethod::PpkKey | AuthMethod::Password)
        {
            self.resolve_putty(method, key_path)?
        } else {
            self.resolve_openssh(method, key_path)?
        };

        tracing::debug!(
            method = %plan.method,
            client = %plan.client.path.display(),
            helper = plan.password_helper.as_ref().map(|h| h.name.as_str()),
            converter = plan.converter.as_ref().map(|c| c.name.as_str()),
            "Authentication resolved"
        );
        Ok(plan)
    }

    fn resolve_openssh(&self, method: AuthMethod, key_path: Option<PathBuf>) -> Result<AuthPlan> {
        let client = self
            .locator
            .locate(OPENSSH_CLIENT)
            .map(|path| ResolvedTool::new(OPENSSH_CLIENT, path))
            .ok_or_else(|| LaunchError::ClientMissing(OPENSSH_CLIENT.to_string()))?;

        let converter = if method == AuthMethod::PpkKey {
            let path = self
                .locator
                .locate(KEY_CONVERTER)
                .ok_or_else(|| CredentialError::ConverterMissing(KEY_CONVERTER.to_string()))?;
            Some(ResolvedTool::new(KEY_CONVERTER, path))
        } else {
            None
        };

        let password_helper = if method == AuthMethod::Password {
            let path = self
                .locator
                .locate(PASSWORD_HELPER)
                .ok_or_else(|| CredentialError::PasswordHelperMissing(PASSWORD_HELPER.to_string()))?;
            Some(ResolvedTool::new(PASSWORD_HELPER, path))
        } else {
            None
        };

        // Native OpenSSH keys are used in place
        let materialized_key_path = if method == AuthMethod::SshKey {
            key_path.clone()
        } else {
            None
        };

        Ok(AuthPlan {
            method,
            platform: self.platform,
            client_kind: ClientKind::OpenSsh,
            client,
            key_path,
            materialized_key_path,
            password_helper,
            converter,
        })
    }

    fn resolve_putty(&self, method: AuthMethod, key_path: Option<PathBuf>) -> Result<AuthPlan> {
        let found = self.locator.locate_any(PUTTY_CLIENTS);
        let (name, path) = match (found, method) {
            (Some(found), _) => found,
            (None, AuthMethod::Password) => {
                return Err(CredentialError::PasswordHelperMissing(PUTTY_CLIENTS.join(" or ")).into())
            }
            (None, _) => return Err(LaunchError::ClientMissing(PUTTY_CLIENTS.join(" or ")).into()),
        };
        let client = ResolvedTool::new(name, path);

        // PuTTY reads PPK natively
        let materialized_key_path = key_path.clone();
        let password_helper = (method == AuthMethod::Password).then(|| client.clone());

        Ok(AuthPlan {
            method,
            platform: self.platform,
            client_kind: ClientKind::Plink,
            client,
            key_path,
            materialized_key_path,
            password_helper,
            converter: None,
        })
    }
}

fn check_key_readable(path: &Path) -> std::result::Result<(), CredentialError> {
    let readable = std::fs::metadata(path).is_ok_and(|m| m.is_file())
        && std::fs::File::open(path).is_ok();
    if readable {
        Ok(())
    } else {
        Err(CredentialError::KeyNotFound(path.to_path_buf()))
    }
}
