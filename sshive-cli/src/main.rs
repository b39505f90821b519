//! `SSHive` CLI - Command-line interface for the `SSHive` connection launcher
//!
//! Provides commands for launching a connection in a terminal, checking
//! credentials, listing terminal emulators, inspecting installed tools and
//! managing the settings file.

use std::fmt::Write as _;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sshive_core::{
    AppSettings, AuthMethod, CancellationToken, ConfigManager, Connection, ErrorKind, GroupPath,
    LaunchFailure, LaunchOptions, LaunchOrchestrator, LaunchOutcome, Platform, SystemToolLocator,
    TerminalDetector, ToolReport,
};
use tracing_subscriber::EnvFilter;

/// Upper bound for each `--version` probe run by `doctor`
const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// `SSHive` command-line interface for launching SSH sessions
#[derive(Parser)]
#[command(name = "sshive-cli")]
#[command(author, version, about = "SSHive command-line interface")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration directory (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log every launch stage to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Open an SSH session in a terminal window
    #[command(about = "Launch a connection in a terminal emulator")]
    Launch {
        #[command(flatten)]
        target: TargetArgs,

        /// Open the terminal without verifying credentials first
        #[arg(long)]
        skip_preflight: bool,

        /// Terminal emulator to prefer (name or executable)
        #[arg(short, long)]
        terminal: Option<String>,
    },

    /// Verify credentials without opening a terminal
    #[command(about = "Check that a connection's credentials are accepted")]
    Check {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// List terminal emulators for this platform
    #[command(about = "List supported terminal emulators and which are installed")]
    Terminals {
        /// Output format
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Report installed clients, helpers and terminals
    #[command(about = "Show the tools SSHive uses and how to install missing ones")]
    Doctor {
        /// Output format
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Manage the settings file
    #[command(subcommand, about = "Manage the settings file")]
    Config(ConfigCommands),
}

/// Connection described on the command line
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Host address (hostname or IP)
    #[arg(short = 'H', long)]
    pub host: String,

    /// Remote login name
    #[arg(short, long)]
    pub user: String,

    /// Port number
    #[arg(short, long, default_value_t = sshive_core::models::DEFAULT_SSH_PORT)]
    pub port: u16,

    /// Display name (defaults to the host)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Group path, e.g. Work/Production
    #[arg(short, long)]
    pub group: Option<String>,

    /// Private key file (a .ppk extension selects PuTTY format)
    #[arg(short, long, conflicts_with_all = ["ppk", "password_stdin"])]
    pub key: Option<PathBuf>,

    /// PuTTY-format private key file
    #[arg(long, conflicts_with = "password_stdin")]
    pub ppk: Option<PathBuf>,

    /// Read the password from the first line of standard input
    #[arg(long)]
    pub password_stdin: bool,
}

/// Settings file subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the settings file location
    Path,
    /// Print the effective settings
    Show,
    /// Write a settings file with default values
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
}

/// Output format for listing commands
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Display as formatted table
    Table,
    /// Output as JSON
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Launch {
            target,
            skip_preflight,
            terminal,
        } => cmd_launch(config, &target, skip_preflight, terminal),
        Commands::Check { target } => cmd_check(config, &target),
        Commands::Terminals { format } => cmd_terminals(config, format),
        Commands::Doctor { format } => cmd_doctor(format),
        Commands::Config(subcmd) => cmd_config(config, subcmd),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ========== Commands ==========

fn cmd_launch(
    config: Option<&Path>,
    target: &TargetArgs,
    skip_preflight: bool,
    terminal: Option<String>,
) -> Result<(), CliError> {
    let mut settings = load_settings(config)?;
    if terminal.is_some() {
        settings.terminal.preferred = terminal;
    }
    let connection = build_connection(target, &mut std::io::stdin().lock())?;
    let options = LaunchOptions { skip_preflight };

    let runtime = runtime()?;
    let outcome = runtime.block_on(async {
        let orchestrator = LaunchOrchestrator::new(settings);
        let cancel = cancel_on_ctrl_c();
        orchestrator.launch_with(&connection, options, cancel).await
    });

    match outcome {
        LaunchOutcome::Success(report) => {
            let pid = report
                .pid
                .map_or_else(|| "unknown".to_string(), |p| p.to_string());
            println!(
                "Launched {connection} in {} (pid {pid})",
                report.terminal
            );
            if !report.preflight_passed && connection.auth_method != AuthMethod::None {
                println!("Credentials were not verified before launch.");
            }
            tracing::debug!(argv = ?report.client_argv, "Client invocation");
            Ok(())
        }
        LaunchOutcome::Failure(failure) => {
            if failure.can_override() {
                eprintln!(
                    "Hint: the credentials could not be verified. \
                     Re-run with --skip-preflight to open the terminal anyway."
                );
            }
            Err(CliError::Launch(failure))
        }
    }
}

fn cmd_check(config: Option<&Path>, target: &TargetArgs) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let connection = build_connection(target, &mut std::io::stdin().lock())?;

    let runtime = runtime()?;
    let outcome = runtime.block_on(async {
        let orchestrator = LaunchOrchestrator::new(settings);
        orchestrator.check(&connection, cancel_on_ctrl_c()).await
    });

    match outcome {
        LaunchOutcome::Success(report) if report.preflight_passed => {
            println!("✓ Credentials accepted for {connection}");
            Ok(())
        }
        LaunchOutcome::Success(_) => {
            println!("{connection} uses no stored credential; nothing to verify");
            Ok(())
        }
        LaunchOutcome::Failure(failure) => Err(CliError::Launch(failure)),
    }
}

fn cmd_terminals(config: Option<&Path>, format: OutputFormat) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let detector = TerminalDetector::new(Platform::current(), SystemToolLocator::shared())
        .with_preferred(settings.terminal.preferred);
    let rows = terminal_rows(&detector);

    match format {
        OutputFormat::Table => println!("{}", format_terminal_table(&rows)),
        OutputFormat::Json => println!("{}", to_json(&rows)?),
    }
    Ok(())
}

fn cmd_doctor(format: OutputFormat) -> Result<(), CliError> {
    let runtime = runtime()?;
    let report = runtime.block_on(ToolReport::collect(
        Platform::current(),
        SystemToolLocator::shared(),
        VERSION_PROBE_TIMEOUT,
    ));

    match format {
        OutputFormat::Table => println!("{}", format_tool_report(&report)),
        OutputFormat::Json => println!("{}", to_json(&report)?),
    }
    Ok(())
}

fn cmd_config(config: Option<&Path>, subcmd: ConfigCommands) -> Result<(), CliError> {
    let manager = config_manager(config)?;
    match subcmd {
        ConfigCommands::Path => {
            println!("{}", manager.settings_path().display());
        }
        ConfigCommands::Show => {
            let settings = manager
                .load_settings()
                .map_err(|e| CliError::Config(format!("Failed to load settings: {e}")))?;
            let rendered = toml::to_string_pretty(&settings)
                .map_err(|e| CliError::Config(format!("Failed to render settings: {e}")))?;
            print!("{rendered}");
        }
        ConfigCommands::Init { force } => {
            let path = manager.settings_path();
            if path.exists() && !force {
                return Err(CliError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            manager
                .save_settings(&AppSettings::default())
                .map_err(|e| CliError::Config(format!("Failed to write settings: {e}")))?;
            println!("Wrote default settings to {}", path.display());
        }
    }
    Ok(())
}

// ========== Helpers ==========

fn config_manager(config: Option<&Path>) -> Result<ConfigManager, CliError> {
    match config {
        Some(dir) => Ok(ConfigManager::with_config_dir(dir.to_path_buf())),
        None => ConfigManager::new()
            .map_err(|e| CliError::Config(format!("Failed to initialize config: {e}"))),
    }
}

fn load_settings(config: Option<&Path>) -> Result<AppSettings, CliError> {
    let manager = config_manager(config)?;
    tracing::debug!(path = %manager.settings_path().display(), "Loading settings");
    manager
        .load_settings()
        .map_err(|e| CliError::Config(format!("Failed to load settings: {e}")))
}

fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Config(format!("Failed to create async runtime: {e}")))
}

/// Returns a token cancelled when the user presses Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
    cancel
}

/// Builds a connection from command-line arguments
///
/// With `--password-stdin` the first line of `input` is the password.
pub fn build_connection(target: &TargetArgs, input: &mut impl BufRead) -> Result<Connection, CliError> {
    let name = target.name.clone().unwrap_or_else(|| target.host.clone());
    let mut connection = Connection::new(name, &target.host, &target.user).with_port(target.port);

    if let Some(group) = &target.group {
        connection = connection.with_group_path(GroupPath::parse(group));
    }
    if let Some(key) = &target.key {
        connection = connection.with_key(key);
    }
    if let Some(ppk) = &target.ppk {
        connection = connection.with_ppk_key(ppk);
    }
    if target.password_stdin {
        let mut line = String::new();
        input.read_line(&mut line)?;
        let password = line.trim_end_matches(['\r', '\n']);
        if password.is_empty() {
            return Err(CliError::Input("No password on standard input".to_string()));
        }
        connection = connection.with_password(password);
    }

    connection
        .validate()
        .map_err(|e| CliError::Input(format!("Invalid connection: {e}")))?;
    Ok(connection)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Config(format!("Failed to serialize to JSON: {e}")))
}

/// One row of the `terminals` listing
#[derive(Debug, Clone, Serialize)]
pub struct TerminalRow {
    /// Position in the order terminals are tried (1 = first)
    pub order: usize,
    /// Terminal name
    pub name: &'static str,
    /// Executable looked up on PATH
    pub executable: &'static str,
    /// Resolved program, if installed
    pub path: Option<PathBuf>,
}

fn terminal_rows(detector: &TerminalDetector) -> Vec<TerminalRow> {
    detector
        .candidates()
        .into_iter()
        .enumerate()
        .map(|(i, profile)| TerminalRow {
            order: i + 1,
            name: profile.name,
            executable: profile.executable,
            path: detector.probe(profile).map(|t| t.program),
        })
        .collect()
}

/// Format terminal rows as a table string
#[must_use]
pub fn format_terminal_table(rows: &[TerminalRow]) -> String {
    if rows.is_empty() {
        return "No terminal emulators are known for this platform.".to_string();
    }

    let name_width = rows.iter().map(|r| r.name.len()).max().unwrap_or(4).max(4);
    let mut output = String::new();
    let _ = writeln!(output, "{:<5}  {:<name_width$}  STATUS", "ORDER", "NAME");
    let _ = writeln!(output, "{}", "-".repeat(5 + 2 + name_width + 2 + 9));
    for row in rows {
        let status = row
            .path
            .as_ref()
            .map_or_else(|| "not installed".to_string(), |p| p.display().to_string());
        let _ = writeln!(output, "{:<5}  {:<name_width$}  {status}", row.order, row.name);
    }

    if let Some(first) = rows.iter().find(|r| r.path.is_some()) {
        let _ = write!(output, "\nLaunches will use {}.", first.name);
    } else {
        let _ = write!(output, "\nNo supported terminal emulator is installed.");
    }
    output
}

/// Format a tool report as a table string
#[must_use]
pub fn format_tool_report(report: &ToolReport) -> String {
    let name_width = report
        .tools
        .iter()
        .map(|t| t.name.len())
        .max()
        .unwrap_or(4)
        .max(4);
    let role_width = 15;

    let mut output = String::new();
    let _ = writeln!(output, "Platform: {}\n", report.platform);
    let _ = writeln!(
        output,
        "{:<name_width$}  {:<role_width$}  VERSION",
        "TOOL", "ROLE"
    );
    let _ = writeln!(output, "{}", "-".repeat(name_width + 2 + role_width + 2 + 20));
    for tool in &report.tools {
        let version = if tool.installed {
            tool.version.as_deref().unwrap_or("installed")
        } else {
            "missing"
        };
        let _ = writeln!(
            output,
            "{:<name_width$}  {:<role_width$}  {version}",
            tool.name,
            tool.role.to_string()
        );
    }

    let hints: Vec<_> = report
        .tools
        .iter()
        .filter(|t| !t.installed)
        .filter_map(|t| t.install_hint.as_deref().map(|h| (t.name.as_str(), h)))
        .collect();
    if !hints.is_empty() {
        let _ = writeln!(output, "\nMissing tools:");
        for (name, hint) in hints {
            let _ = writeln!(output, "  - {name}: {hint}");
        }
    }
    output.trim_end().to_string()
}

// ========== Errors ==========

/// Exit codes for CLI commands
pub mod exit_codes {
    /// Success - operation completed successfully
    pub const SUCCESS: i32 = 0;
    /// General error - configuration, input or other non-launch errors
    pub const GENERAL_ERROR: i32 = 1;
    /// Credential check failed - rejected, unreachable or timed out
    pub const CONNECTION_FAILURE: i32 = 2;
    /// A required client, helper, converter, key or terminal is missing
    pub const MISSING_REQUIREMENT: i32 = 3;
    /// Interrupted by the user
    pub const CANCELLED: i32 = 130;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid command-line input
    #[error("{0}")]
    Input(String),

    /// Launch or check failed
    #[error("{0}")]
    Launch(LaunchFailure),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 1: General error (configuration, input, IO, spawn)
    /// - 2: Credential check failed
    /// - 3: Missing tool, key or terminal
    /// - 130: Cancelled
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Launch(failure) => match failure.kind {
                ErrorKind::AuthRejected | ErrorKind::Unreachable | ErrorKind::Timeout => {
                    exit_codes::CONNECTION_FAILURE
                }
                ErrorKind::KeyNotFound
                | ErrorKind::ConverterMissing
                | ErrorKind::PasswordHelperMissing
                | ErrorKind::ClientMissing
                | ErrorKind::NoTerminalFound
                | ErrorKind::UnsupportedCombination => exit_codes::MISSING_REQUIREMENT,
                ErrorKind::Cancelled => exit_codes::CANCELLED,
                _ => exit_codes::GENERAL_ERROR,
            },
            Self::Config(_) | Self::Input(_) | Self::Io(_) => exit_codes::GENERAL_ERROR,
        }
    }
}
