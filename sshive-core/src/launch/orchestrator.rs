//! Launch attempt state machine.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::auth::{AuthPlan, AuthResolver, KeyMaterializer, MaterializedKey};
use crate::command::{CommandBuilder, LaunchCommand};
use crate::config::AppSettings;
use crate::error::{LaunchError, SshiveError};
use crate::models::{AuthMethod, Connection};
use crate::platform::Platform;
use crate::preflight::{Preflight, PreflightValidator};
use crate::terminal::{DetectedTerminal, TerminalDetector};
use crate::tools::{SystemToolLocator, ToolLocator};

use super::outcome::{LaunchFailure, LaunchOutcome, LaunchReport, LaunchStage};
use super::spawner::{DetachedSpawner, Spawner};

/// Per-call launch options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Skip the credential probe ("try anyway")
    pub skip_preflight: bool,
}

impl LaunchOptions {
    /// Options that skip the credential probe
    #[must_use]
    pub const fn skip_preflight() -> Self {
        Self {
            skip_preflight: true,
        }
    }
}

/// Marks a connection as having an attempt in flight until dropped
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<Uuid>>,
    connection_id: Uuid,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<Uuid>>, connection_id: Uuid) -> Option<Self> {
        let inserted = in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(connection_id);
        inserted.then_some(Self {
            in_flight,
            connection_id,
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.connection_id);
    }
}

/// Everything needed to spawn, produced before the spawn stage
struct Prepared {
    command: LaunchCommand,
    terminal: DetectedTerminal,
    key: Option<MaterializedKey>,
    preflight_passed: bool,
}

/// Runs launch attempts
///
/// Attempts for different connections may run concurrently; a second attempt
/// for a connection whose attempt is still running is rejected.
pub struct LaunchOrchestrator {
    platform: Platform,
    settings: AppSettings,
    locator: Arc<dyn ToolLocator>,
    preflight: Arc<dyn Preflight>,
    spawner: Arc<dyn Spawner>,
    in_flight: Mutex<HashSet<Uuid>>,
}

impl LaunchOrchestrator {
    /// Creates an orchestrator for the current platform using the system
    /// tools, the batch-mode probe and detached spawning
    #[must_use]
    pub fn new(settings: AppSettings) -> Self {
        let preflight = PreflightValidator::new(
            settings.launch.preflight_timeout(),
            settings.launch.connect_timeout(),
        );
        Self {
            platform: Platform::current(),
            settings,
            locator: SystemToolLocator::shared(),
            preflight: Arc::new(preflight),
            spawner: Arc::new(DetachedSpawner),
            in_flight: Mutex::default(),
        }
    }

    /// Uses a different platform table (for dry runs and tests)
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Uses a different tool locator
    pub fn with_locator(mut self, locator: Arc<dyn ToolLocator>) -> Self {
        self.locator = locator;
        self
    }

    /// Uses a different credential probe
    pub fn with_preflight(mut self, preflight: Arc<dyn Preflight>) -> Self {
        self.preflight = preflight;
        self
    }

    /// Uses a different process spawner
    pub fn with_spawner(mut self, spawner: Arc<dyn Spawner>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Returns the active settings
    #[must_use]
    pub const fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Returns the platform launches are built for
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    /// Returns a terminal detector configured like the launch path
    #[must_use]
    pub fn terminal_detector(&self) -> TerminalDetector {
        TerminalDetector::new(self.platform, Arc::clone(&self.locator))
            .with_preferred(self.settings.terminal.preferred.clone())
    }

    /// Launches a connection with default options
    pub async fn launch(&self, connection: &Connection) -> LaunchOutcome {
        self.launch_with(connection, LaunchOptions::default(), CancellationToken::new())
            .await
    }

    /// Launches a connection
    ///
    /// Cancelling `cancel` before the terminal is spawned stops the attempt,
    /// kills any running converter or probe and removes the converted key.
    /// Cancelling after the spawn only cuts the key hand-off grace short.
    ///
    /// For `ppk` keys the call returns only after the key hand-off grace
    /// (`launch.key_handoff_grace_ms`, 5 s by default) has elapsed since the
    /// terminal was spawned, so the converted key is gone once it resolves.
    /// Callers that must not wait should run it on a separate task.
    pub async fn launch_with(
        &self,
        connection: &Connection,
        options: LaunchOptions,
        cancel: CancellationToken,
    ) -> LaunchOutcome {
        let attempt_id = Uuid::new_v4();
        let Some(_in_flight) = InFlightGuard::acquire(&self.in_flight, connection.id) else {
            tracing::warn!(%attempt_id, connection_id = %connection.id, "Launch already in progress");
            return failure(
                &LaunchError::AlreadyInProgress(connection.id).into(),
                LaunchStage::Idle,
            );
        };

        let mut stage = LaunchStage::Idle;
        let prepared = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(SshiveError::from(LaunchError::Cancelled)),
            result = self.prepare(connection, options, attempt_id, &mut stage) => result,
        };

        let prepared = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                tracing::warn!(%attempt_id, connection_id = %connection.id, %stage, error = %err, "Launch failed");
                return failure(&err, stage);
            }
        };

        advance(&mut stage, LaunchStage::Spawning, attempt_id, connection.id);
        if cancel.is_cancelled() {
            return failure(&LaunchError::Cancelled.into(), stage);
        }

        let Prepared {
            command,
            terminal,
            key,
            preflight_passed,
        } = prepared;

        let client_argv = command.display_client_argv();
        tracing::debug!(%attempt_id, args = ?command.display_args(), "Spawning terminal");
        let pid = match self.spawner.spawn(&command) {
            Ok(pid) => pid,
            Err(err) => {
                let err = SshiveError::from(err);
                tracing::warn!(%attempt_id, connection_id = %connection.id, error = %err, "Launch failed");
                return failure(&err, stage);
            }
        };
        drop(command);

        tracing::info!(
            %attempt_id,
            connection_id = %connection.id,
            terminal = terminal.name(),
            pid = ?pid,
            "Terminal launched"
        );

        let report = LaunchReport {
            attempt_id,
            connection_id: connection.id,
            terminal: terminal.name().to_string(),
            program: terminal.program.clone(),
            pid,
            preflight_passed,
            client_argv,
            launched_at: Utc::now(),
        };

        if let Some(key) = key {
            self.hand_off_key(key, &cancel, attempt_id).await;
        }

        advance(&mut stage, LaunchStage::Done, attempt_id, connection.id);
        LaunchOutcome::Success(report)
    }

    /// Resolves, materializes and probes credentials without opening a
    /// terminal
    ///
    /// The probe runs even when settings disable verification. Connections
    /// without credential material are reported as passing.
    pub async fn check(&self, connection: &Connection, cancel: CancellationToken) -> LaunchOutcome {
        let attempt_id = Uuid::new_v4();
        let mut stage = LaunchStage::Idle;

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(SshiveError::from(LaunchError::Cancelled)),
            result = self.probe_only(connection, attempt_id, &mut stage) => result,
        };

        match result {
            Ok(preflight_passed) => LaunchOutcome::Success(LaunchReport {
                attempt_id,
                connection_id: connection.id,
                terminal: String::new(),
                program: std::path::PathBuf::new(),
                pid: None,
                preflight_passed,
                client_argv: Vec::new(),
                launched_at: Utc::now(),
            }),
            Err(err) => failure(&err, stage),
        }
    }

    async fn probe_only(
        &self,
        connection: &Connection,
        attempt_id: Uuid,
        stage: &mut LaunchStage,
    ) -> Result<bool, SshiveError> {
        advance(stage, LaunchStage::Resolving, attempt_id, connection.id);
        let mut plan = self.resolver().resolve(connection)?;

        advance(stage, LaunchStage::Materializing, attempt_id, connection.id);
        let _key = self.materializer().materialize(&mut plan).await?;

        if plan.method == AuthMethod::None {
            return Ok(false);
        }
        advance(stage, LaunchStage::Validating, attempt_id, connection.id);
        self.preflight.check(connection, &plan).await?;
        Ok(true)
    }

    async fn prepare(
        &self,
        connection: &Connection,
        options: LaunchOptions,
        attempt_id: Uuid,
        stage: &mut LaunchStage,
    ) -> Result<Prepared, SshiveError> {
        advance(stage, LaunchStage::Resolving, attempt_id, connection.id);
        let mut plan = self.resolver().resolve(connection)?;

        advance(stage, LaunchStage::Materializing, attempt_id, connection.id);
        let key = self.materializer().materialize(&mut plan).await?;

        let preflight_passed = if self.should_verify(&plan, options) {
            advance(stage, LaunchStage::Validating, attempt_id, connection.id);
            self.preflight.check(connection, &plan).await?;
            true
        } else {
            tracing::debug!(%attempt_id, method = %plan.method, "Credential probe skipped");
            false
        };

        advance(stage, LaunchStage::Detecting, attempt_id, connection.id);
        let terminal = self.terminal_detector().detect()?;

        advance(stage, LaunchStage::Building, attempt_id, connection.id);
        let command = CommandBuilder::new()
            .with_hold_window_on_failure(self.settings.launch.hold_window_on_failure)
            .build(connection, &plan, &terminal)?;

        Ok(Prepared {
            command,
            terminal,
            key,
            preflight_passed,
        })
    }

    fn should_verify(&self, plan: &AuthPlan, options: LaunchOptions) -> bool {
        self.settings.launch.verify_credentials
            && !options.skip_preflight
            && plan.method != AuthMethod::None
    }

    /// Keeps a converted key long enough for the client to read it
    async fn hand_off_key(&self, key: MaterializedKey, cancel: &CancellationToken, attempt_id: Uuid) {
        if key.is_temporary() {
            let grace = self.settings.launch.key_handoff_grace();
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!(%attempt_id, "Key hand-off cut short by cancellation");
                }
                () = tokio::time::sleep(grace) => {}
            }
        }
        if let Err(e) = key.close() {
            tracing::warn!(%attempt_id, error = %e, "Failed to remove converted key");
        }
    }

    fn resolver(&self) -> AuthResolver {
        AuthResolver::new(self.platform, Arc::clone(&self.locator))
    }

    fn materializer(&self) -> KeyMaterializer {
        KeyMaterializer::new(self.settings.launch.conversion_timeout())
            .with_temp_root(self.settings.launch.temp_dir.clone())
    }
}

fn advance(stage: &mut LaunchStage, next: LaunchStage, attempt_id: Uuid, connection_id: Uuid) {
    tracing::debug!(%attempt_id, %connection_id, from = %stage, to = %next, "Launch stage");
    *stage = next;
}

fn failure(err: &SshiveError, stage: LaunchStage) -> LaunchOutcome {
    LaunchOutcome::Failure(LaunchFailure::from_error(err, stage))
}
