//! Terminal emulator detection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{LaunchError, LaunchResult};
use crate::platform::Platform;
use crate::tools::ToolLocator;

use super::profiles::{profiles_for, TerminalProfile, WindowTemplate};

/// A terminal profile found on the host, with the program to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedTerminal {
    /// The matched profile
    pub profile: &'static TerminalProfile,
    /// Program to spawn (the emulator, or `osascript`)
    pub program: PathBuf,
}

impl DetectedTerminal {
    /// Display name of the terminal
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.profile.name
    }
}

/// Finds the best installed terminal emulator for a platform
pub struct TerminalDetector {
    platform: Platform,
    locator: Arc<dyn ToolLocator>,
    preferred: Option<String>,
}

impl TerminalDetector {
    /// Creates a detector for `platform`
    #[must_use]
    pub fn new(platform: Platform, locator: Arc<dyn ToolLocator>) -> Self {
        Self {
            platform,
            locator,
            preferred: None,
        }
    }

    /// Moves the named terminal to the front of the ranking when present
    pub fn with_preferred(mut self, preferred: Option<String>) -> Self {
        self.preferred = preferred.filter(|p| !p.trim().is_empty());
        self
    }

    /// Lists the platform's candidates in the order they are tried
    #[must_use]
    pub fn candidates(&self) -> Vec<&'static TerminalProfile> {
        let mut profiles = profiles_for(self.platform);
        if let Some(preferred) = &self.preferred {
            if let Some(pos) = profiles.iter().position(|p| p.matches(preferred)) {
                let profile = profiles.remove(pos);
                profiles.insert(0, profile);
            }
        }
        profiles
    }

    /// Checks a single profile for presence
    #[must_use]
    pub fn probe(&self, profile: &'static TerminalProfile) -> Option<DetectedTerminal> {
        let program = match profile.window_template {
            WindowTemplate::AppleScript(_) => {
                let app_present = profile
                    .install_paths
                    .iter()
                    .any(|path| self.locator.exists(Path::new(path)));
                if !app_present {
                    return None;
                }
                self.locator.locate(profile.executable)?
            }
            WindowTemplate::Argv(_) | WindowTemplate::CmdStart => self.locator.locate(profile.executable).or_else(|| {
                profile
                    .install_paths
                    .iter()
                    .map(PathBuf::from)
                    .find(|path| self.locator.exists(path))
            })?,
        };
        Some(DetectedTerminal { profile, program })
    }

    /// Returns every installed terminal in the order they would be tried
    #[must_use]
    pub fn detect_all(&self) -> Vec<DetectedTerminal> {
        self.candidates()
            .into_iter()
            .filter_map(|profile| self.probe(profile))
            .collect()
    }

    /// Returns the first installed terminal
    pub fn detect(&self) -> LaunchResult<DetectedTerminal> {
        let candidates = self.candidates();
        for profile in candidates.iter().copied() {
            if let Some(found) = self.probe(profile) {
                tracing::debug!(
                    terminal = found.name(),
                    program = %found.program.display(),
                    "Terminal detected"
                );
                return Ok(found);
            }
        }

        let tried = candidates
            .iter()
            .map(|p| p.executable)
            .collect::<Vec<_>>()
            .join(", ");
        Err(LaunchError::NoTerminalFound(tried))
    }
}
