//! Non-interactive login probe through the system client.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use secrecy::SecretString;

use crate::auth::{AuthPlan, ClientKind};
use crate::command::{
    openssh_identity_args, path_arg, plink_credential_args, LaunchCommand, PASSWORD_ENV,
};
use crate::error::{CredentialError, CredentialResult};
use crate::models::{AuthMethod, Connection};

use super::Preflight;

/// Exit status `sshpass` uses for a rejected password
const SSHPASS_BAD_PASSWORD: i32 = 5;

/// Exit status OpenSSH uses for connection-level errors
const SSH_CONNECTION_ERROR: i32 = 255;

static AUTH_REJECTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)permission denied|access denied|authentication failed|too many authentication failures|no supported authentication methods")
        .expect("Authentication failure regex is valid")
});

static UNREACHABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)could not resolve hostname|connection refused|no route to host|network is unreachable|connection timed out|operation timed out|host does not exist|name or service not known|connection reset|connection closed by")
        .expect("Network failure regex is valid")
});

/// What a finished probe process reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutput {
    /// Exit code, `None` if killed by a signal
    pub exit_code: Option<i32>,
    /// Captured stderr followed by stdout
    pub diagnostic: String,
}

/// Classifies a finished probe
///
/// # Errors
///
/// - [`CredentialError::AuthRejected`] when the host refused the credentials
/// - [`CredentialError::Unreachable`] for network and connection-level errors
pub fn classify_probe(
    client_kind: ClientKind,
    via_helper: bool,
    output: &ProbeOutput,
) -> CredentialResult<()> {
    let diagnostic = output.diagnostic.trim();
    let detail = || {
        if diagnostic.is_empty() {
            output.exit_code.map_or_else(
                || "probe terminated by signal".to_string(),
                |code| format!("probe exited with status {code}"),
            )
        } else {
            first_line(diagnostic)
        }
    };

    if output.exit_code == Some(0) {
        return Ok(());
    }
    if via_helper && output.exit_code == Some(SSHPASS_BAD_PASSWORD) {
        return Err(CredentialError::AuthRejected("password rejected".to_string()));
    }
    if AUTH_REJECTED.is_match(diagnostic) {
        return Err(CredentialError::AuthRejected(detail()));
    }
    if UNREACHABLE.is_match(diagnostic) {
        return Err(CredentialError::Unreachable(detail()));
    }

    match (client_kind, output.exit_code) {
        (_, None) => Err(CredentialError::Unreachable(detail())),
        // sshpass reports its own failures as 1-6
        (ClientKind::OpenSsh, Some(1..=6)) if via_helper => {
            Err(CredentialError::Unreachable(detail()))
        }
        (ClientKind::OpenSsh, Some(SSH_CONNECTION_ERROR)) | (ClientKind::Plink, Some(_)) => {
            Err(CredentialError::Unreachable(detail()))
        }
        // Logged in; the remote command itself failed
        (ClientKind::OpenSsh, Some(_)) => Ok(()),
    }
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Probes credentials with `ssh` (or `plink` on Windows) in batch mode
#[derive(Debug, Clone, Copy)]
pub struct PreflightValidator {
    timeout: Duration,
    connect_timeout: Duration,
}

impl PreflightValidator {
    /// Creates a validator
    ///
    /// `timeout` bounds the whole probe; `connect_timeout` is handed to the
    /// client so unreachable hosts fail fast.
    #[must_use]
    pub const fn new(timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            timeout,
            connect_timeout,
        }
    }

    /// Builds the probe invocation
    #[must_use]
    pub fn probe_command(&self, connection: &Connection, plan: &AuthPlan) -> LaunchCommand {
        let mut argv = Vec::new();
        let mut env = Vec::new();

        match plan.client_kind {
            ClientKind::OpenSsh => {
                let password = plan.method == AuthMethod::Password;
                if let Some(helper) = &plan.password_helper {
                    argv.push(path_arg(&helper.path));
                    argv.push("-e".to_string());
                    let secret = connection.expose_password().unwrap_or_default();
                    env.push((PASSWORD_ENV.to_string(), SecretString::from(secret.to_string())));
                }
                argv.push(path_arg(&plan.client.path));
                argv.extend(
                    [
                        "-p".to_string(),
                        connection.port.to_string(),
                        "-o".to_string(),
                        format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
                        "-o".to_string(),
                        "StrictHostKeyChecking=accept-new".to_string(),
                        "-o".to_string(),
                        format!("BatchMode={}", if password { "no" } else { "yes" }),
                    ],
                );
                argv.extend(openssh_identity_args(plan));
                if password {
                    argv.extend(
                        [
                            "-o",
                            "PubkeyAuthentication=no",
                            "-o",
                            "PreferredAuthentications=password,keyboard-interactive",
                            "-o",
                            "NumberOfPasswordPrompts=1",
                        ]
                        .map(ToString::to_string),
                    );
                }
            }
            ClientKind::Plink => {
                argv.push(path_arg(&plan.client.path));
                argv.extend(["-ssh", "-batch", "-P"].map(ToString::to_string));
                argv.push(connection.port.to_string());
                // Validation already guarantees the password is present
                argv.extend(plink_credential_args(connection, plan).unwrap_or_default());
            }
        }

        argv.push(connection.destination());
        argv.push("true".to_string());

        let program: PathBuf = argv.first().cloned().unwrap_or_default().into();
        let args = argv.iter().skip(1).cloned().collect();
        LaunchCommand {
            program,
            args,
            env,
            client_argv: argv,
            verbatim_args: false,
        }
    }

    async fn run_probe(&self, probe: &LaunchCommand) -> CredentialResult<ProbeOutput> {
        let mut command = tokio::process::Command::from(probe.to_command());
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(CredentialError::Unreachable(format!(
                    "failed to run {}: {e}",
                    probe.program.display()
                )))
            }
            Err(_) => return Err(CredentialError::Timeout(self.timeout)),
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(ProbeOutput {
            exit_code: output.status.code(),
            diagnostic: format!("{stderr}{stdout}"),
        })
    }
}

#[async_trait]
impl Preflight for PreflightValidator {
    async fn check(&self, connection: &Connection, plan: &AuthPlan) -> CredentialResult<()> {
        let probe = self.probe_command(connection, plan);
        tracing::debug!(argv = ?probe.display_client_argv(), "Running credential probe");

        let output = self.run_probe(&probe).await?;
        let result = classify_probe(plan.client_kind, plan.requires_helper(), &output);

        match &result {
            Ok(()) => tracing::debug!(exit_code = ?output.exit_code, "Credential probe passed"),
            Err(e) => tracing::warn!(exit_code = ?output.exit_code, error = %e, "Credential probe failed"),
        }
        result
    }

    fn name(&self) -> &'static str {
        "ssh batch probe"
    }
}
