//! Terminal process creation.

use std::process::Stdio;

use crate::command::LaunchCommand;
use crate::error::{LaunchError, LaunchResult};

/// Starts a built terminal invocation
pub trait Spawner: Send + Sync {
    /// Starts `command` and returns its process id, if known
    ///
    /// Returns once the OS has created the process; the process is not
    /// communicated with afterwards.
    fn spawn(&self, command: &LaunchCommand) -> LaunchResult<Option<u32>>;
}

/// Spawns the terminal detached from the launcher
///
/// Standard streams are closed and, on Unix, the child gets its own process
/// group so it survives the launcher and ignores its terminal signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedSpawner;

impl Spawner for DetachedSpawner {
    fn spawn(&self, command: &LaunchCommand) -> LaunchResult<Option<u32>> {
        let mut process = command.to_command();
        process
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            process.process_group(0);
        }

        let mut child = process
            .spawn()
            .map_err(|e| LaunchError::SpawnFailed(format!("{}: {e}", command.program.display())))?;
        let pid = child.id();

        // Reap the child when it exits so it does not linger as a zombie
        std::thread::Builder::new()
            .name(format!("sshive-reap-{pid}"))
            .spawn(move || {
                let _ = child.wait();
            })
            .map_err(|e| LaunchError::SpawnFailed(format!("cannot watch terminal process: {e}")))?;

        Ok(Some(pid))
    }
}
