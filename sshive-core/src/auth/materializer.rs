//! Temporary OpenSSH key production for PuTTY-format keys.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;

use crate::error::{CredentialError, CredentialResult};
use crate::models::AuthMethod;

use super::resolver::AuthPlan;

/// File name of the converted key inside the per-attempt directory
pub const CONVERTED_KEY_NAME: &str = "id_converted";

const TEMP_PREFIX: &str = "sshive-";

/// A key file usable by the client for the duration of one attempt
///
/// For converted keys the guard owns a private temporary directory that is
/// removed, with the key inside it, when the guard is dropped.
#[derive(Debug)]
pub struct MaterializedKey {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl MaterializedKey {
    fn passthrough(path: PathBuf) -> Self {
        Self { path, dir: None }
    }

    /// Path of the key file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the key is a temporary converted copy
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        self.dir.is_some()
    }

    /// Removes the temporary directory now, reporting failures
    pub fn close(self) -> std::io::Result<()> {
        match self.dir {
            Some(dir) => {
                let dir_path = dir.path().to_path_buf();
                dir.close()?;
                tracing::debug!(dir = %dir_path.display(), "Removed converted key");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Produces OpenSSH-readable key files
#[derive(Debug, Clone)]
pub struct KeyMaterializer {
    temp_root: Option<PathBuf>,
    timeout: Duration,
}

impl KeyMaterializer {
    /// Creates a materializer using the system temp directory
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            temp_root: None,
            timeout,
        }
    }

    /// Places per-attempt directories under `root` instead of the system temp dir
    pub fn with_temp_root(mut self, root: Option<PathBuf>) -> Self {
        self.temp_root = root;
        self
    }

    /// Makes the plan's key readable by the client
    ///
    /// Returns `None` for methods without a key file. Native keys pass
    /// through; PPK keys are converted into a fresh private directory and
    /// `plan.materialized_key_path` is set to the converted file.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::ConversionFailed`] if the converter fails,
    /// times out, or produces no file. The temporary directory is removed.
    pub async fn materialize(&self, plan: &mut AuthPlan) -> CredentialResult<Option<MaterializedKey>> {
        if !plan.method.uses_key_file() {
            return Ok(None);
        }
        let Some(source) = plan.key_path.clone() else {
            return Ok(None);
        };

        let Some(converter) = plan.converter.clone() else {
            plan.materialized_key_path = Some(source.clone());
            return Ok(Some(MaterializedKey::passthrough(source)));
        };
        debug_assert_eq!(plan.method, AuthMethod::PpkKey);

        let dir = self.create_private_dir()?;
        let output_path = dir.path().join(CONVERTED_KEY_NAME);

        let mut command = tokio::process::Command::new(&converter.path);
        command
            .arg(&source)
            .args(["-O", "private-openssh", "-o"])
            .arg(&output_path)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        tracing::debug!(
            source = %source.display(),
            dir = %dir.path().display(),
            "Converting PPK key"
        );

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(CredentialError::ConversionFailed(format!(
                    "failed to run {}: {e}",
                    converter.name
                )))
            }
            Err(_) => {
                return Err(CredentialError::ConversionFailed(format!(
                    "{} did not finish within {}s",
                    converter.name,
                    self.timeout.as_secs()
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let diagnostic = [stderr.trim(), stdout.trim()]
                .into_iter()
                .find(|s| !s.is_empty())
                .map_or_else(|| format!("{} exited with {}", converter.name, output.status), str::to_string);
            return Err(CredentialError::ConversionFailed(diagnostic));
        }

        if !output_path.is_file() {
            return Err(CredentialError::ConversionFailed(format!(
                "{} produced no key file",
                converter.name
            )));
        }

        restrict_permissions(&output_path, 0o600)
            .await
            .map_err(|e| CredentialError::ConversionFailed(format!("cannot protect converted key: {e}")))?;

        plan.materialized_key_path = Some(output_path.clone());
        Ok(Some(MaterializedKey {
            path: output_path,
            dir: Some(dir),
        }))
    }

    fn create_private_dir(&self) -> CredentialResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX);
        let created = match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        let dir = created.map_err(|e| {
            CredentialError::ConversionFailed(format!("cannot create temporary directory: {e}"))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o700)).map_err(
                |e| CredentialError::ConversionFailed(format!("cannot protect temporary directory: {e}")),
            )?;
        }

        Ok(dir)
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}
