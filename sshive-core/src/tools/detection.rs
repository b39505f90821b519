//! Inventory of the external tools the launcher depends on
//!
//! Used for diagnostics: which client, converter, password helper and
//! terminal emulators are installed, their versions, and how to install the
//! missing ones.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;

use crate::platform::Platform;
use crate::terminal::{TerminalDetector, WindowTemplate};

use super::ToolLocator;

/// What a tool is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolRole {
    /// Remote-login client
    Client,
    /// PPK to OpenSSH key converter
    Converter,
    /// Password-capable helper
    PasswordHelper,
    /// Terminal emulator
    Terminal,
}

impl std::fmt::Display for ToolRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Converter => write!(f, "key converter"),
            Self::PasswordHelper => write!(f, "password helper"),
            Self::Terminal => write!(f, "terminal"),
        }
    }
}

/// Information about a detected tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    /// Display name of the tool
    pub name: String,
    /// What the tool is used for
    pub role: ToolRole,
    /// Path to the binary, if found
    pub path: Option<PathBuf>,
    /// Version string extracted from the tool
    pub version: Option<String>,
    /// Whether the tool is installed and accessible
    pub installed: bool,
    /// Installation hint for missing tools
    pub install_hint: Option<String>,
}

impl ToolInfo {
    /// Creates a new `ToolInfo` for an installed tool
    #[must_use]
    pub fn installed(
        name: impl Into<String>,
        role: ToolRole,
        path: PathBuf,
        version: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role,
            path: Some(path),
            version,
            installed: true,
            install_hint: None,
        }
    }

    /// Creates a new `ToolInfo` for a missing tool
    #[must_use]
    pub fn not_installed(
        name: impl Into<String>,
        role: ToolRole,
        install_hint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role,
            path: None,
            version: None,
            installed: false,
            install_hint: Some(install_hint.into()),
        }
    }
}

struct ToolSpec {
    name: &'static str,
    role: ToolRole,
    binaries: &'static [&'static str],
    version_args: &'static [&'static str],
    install_hint: &'static str,
}

fn specs_for(platform: Platform) -> Vec<ToolSpec> {
    match platform {
        Platform::Linux => vec![
            ToolSpec {
                name: "OpenSSH",
                role: ToolRole::Client,
                binaries: &["ssh"],
                version_args: &["-V"],
                install_hint: "Install OpenSSH: sudo apt install openssh-client (Debian/Ubuntu) or sudo dnf install openssh-clients (Fedora)",
            },
            ToolSpec {
                name: "puttygen",
                role: ToolRole::Converter,
                binaries: &["puttygen"],
                version_args: &["--version"],
                install_hint: "Install PuTTY tools: sudo apt install putty-tools (Debian/Ubuntu) or sudo dnf install putty (Fedora)",
            },
            ToolSpec {
                name: "sshpass",
                role: ToolRole::PasswordHelper,
                binaries: &["sshpass"],
                version_args: &["-V"],
                install_hint: "Install sshpass: sudo apt install sshpass (Debian/Ubuntu) or sudo dnf install sshpass (Fedora)",
            },
        ],
        Platform::MacOs => vec![
            ToolSpec {
                name: "OpenSSH",
                role: ToolRole::Client,
                binaries: &["ssh"],
                version_args: &["-V"],
                install_hint: "OpenSSH ships with macOS; check that /usr/bin is on PATH",
            },
            ToolSpec {
                name: "puttygen",
                role: ToolRole::Converter,
                binaries: &["puttygen"],
                version_args: &["--version"],
                install_hint: "Install PuTTY tools: brew install putty",
            },
            ToolSpec {
                name: "sshpass",
                role: ToolRole::PasswordHelper,
                binaries: &["sshpass"],
                version_args: &["-V"],
                install_hint: "Install sshpass: brew install hudochenkov/sshpass/sshpass",
            },
        ],
        Platform::Windows => vec![
            ToolSpec {
                name: "OpenSSH",
                role: ToolRole::Client,
                binaries: &["ssh"],
                version_args: &["-V"],
                install_hint: "Enable the \"OpenSSH Client\" optional Windows feature",
            },
            ToolSpec {
                name: "PuTTY link",
                role: ToolRole::PasswordHelper,
                binaries: &["plink", "klink"],
                version_args: &["-V"],
                install_hint: "Install PuTTY (plink) or KiTTY (klink) and add it to PATH",
            },
        ],
    }
}

/// Result of detecting every tool for a platform
#[derive(Debug, Clone, Serialize)]
pub struct ToolReport {
    /// Platform the report was produced for
    pub platform: Platform,
    /// Client, converter and helper entries followed by terminals in rank order
    pub tools: Vec<ToolInfo>,
}

impl ToolReport {
    /// Detects all tools, probing versions concurrently
    ///
    /// Each version probe is bounded by `probe_timeout`.
    pub async fn collect(
        platform: Platform,
        locator: Arc<dyn ToolLocator>,
        probe_timeout: Duration,
    ) -> Self {
        let detector = TerminalDetector::new(platform, Arc::clone(&locator));
        let locator = locator.as_ref();

        let specs = specs_for(platform);
        let tool_probes = specs
            .iter()
            .map(|spec| async move { detect_tool(spec, locator, probe_timeout).await });

        let terminal_probes = detector.candidates().into_iter().map(|profile| {
            let found = detector.probe(profile);
            async move {
                match found {
                    Some(found) => {
                        let version = match found.profile.window_template {
                            WindowTemplate::Argv(_) => {
                                probe_version(&found.program, &["--version"], probe_timeout).await
                            }
                            WindowTemplate::AppleScript(_) | WindowTemplate::CmdStart => None,
                        };
                        ToolInfo::installed(profile.name, ToolRole::Terminal, found.program, version)
                    }
                    None => ToolInfo::not_installed(
                        profile.name,
                        ToolRole::Terminal,
                        format!("Optional: install {} to use it", profile.executable),
                    ),
                }
            }
        });

        let (mut tools, terminals) = futures::join!(join_all(tool_probes), join_all(terminal_probes));
        tools.extend(terminals);

        Self { platform, tools }
    }

    /// Finds an entry by display name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolInfo> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Returns the entries with the given role
    pub fn by_role(&self, role: ToolRole) -> impl Iterator<Item = &ToolInfo> {
        self.tools.iter().filter(move |t| t.role == role)
    }

    /// Returns true if at least one terminal emulator is installed
    #[must_use]
    pub fn has_terminal(&self) -> bool {
        self.by_role(ToolRole::Terminal).any(|t| t.installed)
    }
}

async fn detect_tool(spec: &ToolSpec, locator: &dyn ToolLocator, timeout: Duration) -> ToolInfo {
    match locator.locate_any(spec.binaries) {
        Some((binary, path)) => {
            let version = probe_version(&path, spec.version_args, timeout).await;
            let name = if spec.binaries.len() > 1 {
                format!("{} ({binary})", spec.name)
            } else {
                spec.name.to_string()
            };
            ToolInfo::installed(name, spec.role, path, version)
        }
        None => ToolInfo::not_installed(spec.name, spec.role, spec.install_hint),
    }
}

/// Gets version information from a binary
async fn probe_version(program: &Path, args: &[&str], timeout: Duration) -> Option<String> {
    let mut command = tokio::process::Command::new(program);
    command.args(args).stdin(Stdio::null()).kill_on_drop(true);

    let output = tokio::time::timeout(timeout, command.output())
        .await
        .ok()?
        .ok()?;

    // Version info might be in stdout or stderr depending on the tool
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    parse_version(&format!("{stdout}{stderr}"))
}

/// Parses a version string from command output
///
/// Returns the first line that looks like version information, or the first
/// non-empty line.
#[must_use]
pub fn parse_version(output: &str) -> Option<String> {
    // OpenSSH: "OpenSSH_9.6p1 Ubuntu-3ubuntu13, OpenSSL 3.0.13 30 Jan 2024"
    // puttygen: "puttygen: Release 0.81"
    // plink: "plink: Release 0.80"
    // sshpass: "sshpass 1.09"
    let markers = ["version", "Version", "OpenSSH", "Release", "sshpass", "KiTTY"];
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find(|line| markers.iter().any(|m| line.contains(m)))
        .or_else(|| output.lines().map(str::trim).find(|line| !line.is_empty()))
        .map(extract_version_string)
}

fn extract_version_string(line: &str) -> String {
    line.chars().take(100).collect::<String>().trim().to_string()
}
