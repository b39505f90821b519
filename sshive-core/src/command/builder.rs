//! Client argument vectors and terminal wrapping.

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};

use crate::auth::{AuthPlan, ClientKind};
use crate::error::{LaunchError, LaunchResult};
use crate::models::{AuthMethod, Connection};
use crate::terminal::{DetectedTerminal, WindowTemplate};

use super::quote::{applescript_quote, cmd_quote, shell_join};

/// Environment variable `sshpass -e` reads the password from
pub const PASSWORD_ENV: &str = "SSHPASS";

/// Replacement shown for secrets in logs and diagnostics
pub const PASSWORD_MASK: &str = "********";

/// Empty window title; `start` would otherwise take a quoted program path as
/// the title
const CMD_EMPTY_TITLE: &str = "\"\"";

/// A fully built terminal invocation
pub struct LaunchCommand {
    /// Program to spawn (terminal emulator or `osascript`)
    pub program: std::path::PathBuf,
    /// Arguments for `program`
    pub args: Vec<String>,
    /// Secret environment for the spawned process
    pub env: Vec<(String, SecretString)>,
    /// The bare client invocation inside the terminal
    pub client_argv: Vec<String>,
    /// `args` are already escaped for the target and must be passed through
    /// without further quoting (Windows `cmd` lines)
    pub verbatim_args: bool,
}

impl LaunchCommand {
    /// Arguments with secret values masked, safe to log
    #[must_use]
    pub fn display_args(&self) -> Vec<String> {
        mask_secrets(&self.args)
    }

    /// Client invocation with secret values masked, safe to log
    #[must_use]
    pub fn display_client_argv(&self) -> Vec<String> {
        mask_secrets(&self.client_argv)
    }

    /// Creates a `std::process::Command` carrying the secret environment
    #[must_use]
    pub fn to_command(&self) -> std::process::Command {
        let mut command = std::process::Command::new(&self.program);
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            if self.verbatim_args {
                for arg in &self.args {
                    command.raw_arg(arg);
                }
            } else {
                command.args(&self.args);
            }
        }
        #[cfg(not(windows))]
        command.args(&self.args);
        for (key, value) in &self.env {
            command.env(key, value.expose_secret());
        }
        command
    }
}

impl std::fmt::Debug for LaunchCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let env: Vec<String> = self
            .env
            .iter()
            .map(|(key, _)| format!("{key}={PASSWORD_MASK}"))
            .collect();
        f.debug_struct("LaunchCommand")
            .field("program", &self.program)
            .field("args", &self.display_args())
            .field("env", &env)
            .field("client_argv", &self.display_client_argv())
            .field("verbatim_args", &self.verbatim_args)
            .finish()
    }
}

/// Masks the value following a `-pw` flag
#[must_use]
pub fn mask_secrets(args: &[String]) -> Vec<String> {
    let mut masked = Vec::with_capacity(args.len());
    let mut hide_next = false;
    for arg in args {
        if hide_next {
            masked.push(PASSWORD_MASK.to_string());
            hide_next = false;
        } else {
            hide_next = arg == "-pw";
            masked.push(arg.clone());
        }
    }
    masked
}

/// Composes the client invocation and wraps it for the terminal
#[derive(Debug, Clone, Copy)]
pub struct CommandBuilder {
    hold_window_on_failure: bool,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBuilder {
    /// Creates a builder that keeps failed sessions' windows open
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hold_window_on_failure: true,
        }
    }

    /// Sets whether the window waits for Enter after a failed session
    pub const fn with_hold_window_on_failure(mut self, hold: bool) -> Self {
        self.hold_window_on_failure = hold;
        self
    }

    /// Builds the terminal invocation for a resolved plan
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::UnsupportedCombination`] when the password has
    /// to travel through the environment and the terminal does not pass it on.
    pub fn build(
        &self,
        connection: &Connection,
        plan: &AuthPlan,
        terminal: &DetectedTerminal,
    ) -> LaunchResult<LaunchCommand> {
        let (client_argv, env) = client_command(connection, plan)?;

        if !env.is_empty() && !terminal.profile.inherits_environment {
            return Err(LaunchError::UnsupportedCombination {
                method: plan.method,
                terminal: terminal.name().to_string(),
            });
        }

        let command_line = if plan.platform.is_unix() && self.hold_window_on_failure {
            hold_on_failure(&client_argv)
        } else {
            client_argv.clone()
        };

        let args = match terminal.profile.window_template {
            WindowTemplate::Argv(flags) => flags
                .iter()
                .map(ToString::to_string)
                .chain(command_line)
                .collect(),
            WindowTemplate::AppleScript(script) => {
                let cmd = applescript_quote(&shell_join(&command_line));
                vec!["-e".to_string(), script.replace("{cmd}", &cmd)]
            }
            WindowTemplate::CmdStart => ["/c", "start", CMD_EMPTY_TITLE]
                .iter()
                .map(ToString::to_string)
                .chain(command_line.iter().map(|word| cmd_quote(word)))
                .collect(),
        };

        Ok(LaunchCommand {
            program: terminal.program.clone(),
            args,
            env,
            client_argv,
            verbatim_args: terminal.profile.window_template == WindowTemplate::CmdStart,
        })
    }
}

type ClientCommand = (Vec<String>, Vec<(String, SecretString)>);

fn client_command(connection: &Connection, plan: &AuthPlan) -> LaunchResult<ClientCommand> {
    let mut argv = Vec::new();
    let mut env = Vec::new();

    match plan.client_kind {
        ClientKind::OpenSsh => {
            if let Some(helper) = &plan.password_helper {
                argv.push(path_arg(&helper.path));
                argv.push("-e".to_string());
                env.push((PASSWORD_ENV.to_string(), password_secret(connection)?));
            }
            argv.push(path_arg(&plan.client.path));
            argv.push("-p".to_string());
            argv.push(connection.port.to_string());
            argv.extend(openssh_identity_args(plan));
        }
        ClientKind::Plink => {
            argv.push(path_arg(&plan.client.path));
            argv.push("-ssh".to_string());
            argv.push("-P".to_string());
            argv.push(connection.port.to_string());
            argv.extend(plink_credential_args(connection, plan)?);
        }
    }

    argv.push(connection.destination());
    Ok((argv, env))
}

/// `-i <key> -o IdentitiesOnly=yes` for OpenSSH when a key is in use
pub fn openssh_identity_args(plan: &AuthPlan) -> Vec<String> {
    plan.identity_path().map_or_else(Vec::new, |key| {
        vec![
            "-i".to_string(),
            path_arg(key),
            "-o".to_string(),
            "IdentitiesOnly=yes".to_string(),
        ]
    })
}

/// `-i <key>` and `-pw <password>` for the PuTTY family
pub fn plink_credential_args(
    connection: &Connection,
    plan: &AuthPlan,
) -> LaunchResult<Vec<String>> {
    let mut args = Vec::new();
    if let Some(key) = plan.identity_path() {
        args.push("-i".to_string());
        args.push(path_arg(key));
    }
    if plan.method == AuthMethod::Password {
        let password = connection
            .expose_password()
            .ok_or_else(|| LaunchError::InvalidConnection("missing password".to_string()))?;
        args.push("-pw".to_string());
        args.push(password.to_string());
    }
    Ok(args)
}

fn password_secret(connection: &Connection) -> LaunchResult<SecretString> {
    connection
        .expose_password()
        .map(|p| SecretString::from(p.to_string()))
        .ok_or_else(|| LaunchError::InvalidConnection("missing password".to_string()))
}

/// Renders a path as a process argument
pub fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn hold_on_failure(client_argv: &[String]) -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        format!(
            "{} || {{ echo; echo '----'; echo 'Connection failed or closed.'; printf 'Press Enter to close...'; read _; }}",
            shell_join(client_argv)
        ),
    ]
}
