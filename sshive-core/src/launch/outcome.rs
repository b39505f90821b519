//! Launch attempt results.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{ErrorKind, SshiveError};

/// Stage of a launch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchStage {
    /// Not started
    Idle,
    /// Deciding the authentication method and checking tools
    Resolving,
    /// Producing a usable key file
    Materializing,
    /// Probing credentials
    Validating,
    /// Finding a terminal emulator
    Detecting,
    /// Building the terminal invocation
    Building,
    /// Starting the terminal process
    Spawning,
    /// Terminal started
    Done,
}

impl std::fmt::Display for LaunchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::Materializing => "materializing",
            Self::Validating => "validating",
            Self::Detecting => "detecting",
            Self::Building => "building",
            Self::Spawning => "spawning",
            Self::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// Details of a started terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchReport {
    /// Identifier of this attempt
    pub attempt_id: Uuid,
    /// Connection that was launched
    pub connection_id: Uuid,
    /// Terminal emulator name
    pub terminal: String,
    /// Program that was spawned
    pub program: PathBuf,
    /// Process id of the spawned program, when known
    pub pid: Option<u32>,
    /// Whether a credential probe ran and passed
    pub preflight_passed: bool,
    /// Client invocation with secrets masked
    pub client_argv: Vec<String>,
    /// When the terminal was spawned
    pub launched_at: DateTime<Utc>,
}

/// Why an attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchFailure {
    /// Failure class
    pub kind: ErrorKind,
    /// Human-readable description
    pub detail: String,
    /// Stage the attempt was in
    pub stage: LaunchStage,
}

impl LaunchFailure {
    /// Creates a failure from an error raised at `stage`
    #[must_use]
    pub fn from_error(err: &SshiveError, stage: LaunchStage) -> Self {
        Self {
            kind: ErrorKind::from(err),
            detail: err.to_string(),
            stage,
        }
    }

    /// Returns true if the user may launch anyway, skipping the probe
    #[must_use]
    pub const fn can_override(&self) -> bool {
        self.kind.is_overridable()
    }
}

impl std::fmt::Display for LaunchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (while {})", self.detail, self.stage)
    }
}

/// Result of one launch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The terminal was spawned
    Success(LaunchReport),
    /// The attempt stopped before a terminal was spawned
    Failure(LaunchFailure),
}

impl LaunchOutcome {
    /// Returns true for a spawned terminal
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the failure, if any
    #[must_use]
    pub const fn failure(&self) -> Option<&LaunchFailure> {
        match self {
            Self::Failure(failure) => Some(failure),
            Self::Success(_) => None,
        }
    }

    /// Returns the report, if any
    #[must_use]
    pub const fn report(&self) -> Option<&LaunchReport> {
        match self {
            Self::Success(report) => Some(report),
            Self::Failure(_) => None,
        }
    }
}
