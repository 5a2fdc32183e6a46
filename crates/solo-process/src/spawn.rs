//! Process spawning.
//!
//! Two stdio routings: foreground (inherited terminal, caller supervises
//! the child) and daemon (detached, stdout/stderr appended to a log file,
//! nobody waits). On Unix every child leads its own process group so the
//! termination engine can reach its descendants.

use solo_common::{ProcessName, Result, SupervisorError};
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info};

#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x0000_0008;
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

fn split_command<'a>(name: &ProcessName, command: &'a [String]) -> Result<(&'a String, &'a [String])> {
    command.split_first().ok_or_else(|| {
        SupervisorError::spawn_failed(name.as_str(), "empty command".to_string())
    })
}

/// Spawns the command with inherited stdio for interactive foreground use.
///
/// The returned child is unwaited; the caller owns supervision (signal
/// forwarding, exit status collection). Must be called inside a tokio
/// runtime.
pub fn spawn_foreground(name: &ProcessName, command: &[String]) -> Result<Child> {
    let (executable, args) = split_command(name, command)?;

    let mut cmd = Command::new(executable);
    cmd.args(args);
    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd
        .spawn()
        .map_err(|e| SupervisorError::spawn_failed(name.as_str(), e.to_string()))?;

    debug!(name = %name, pid = child.id(), "spawned foreground process");
    Ok(child)
}

/// Spawns the command detached, with stdout and stderr appended to
/// `log_path`, and returns the new PID.
///
/// The child handle is dropped immediately: the process outlives this
/// invocation and the runtime reaps it in the background if it exits while
/// the invocation is still running.
pub fn spawn_daemon(name: &ProcessName, command: &[String], log_path: &Path) -> Result<u32> {
    let (executable, args) = split_command(name, command)?;

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            SupervisorError::spawn_failed(
                name.as_str(),
                format!("failed to create log directory {}: {}", parent.display(), e),
            )
        })?;
    }
    let log = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|e| {
            SupervisorError::spawn_failed(
                name.as_str(),
                format!("failed to open log file {}: {}", log_path.display(), e),
            )
        })?;
    let log_err = log.try_clone().map_err(|e| {
        SupervisorError::spawn_failed(name.as_str(), format!("failed to clone log handle: {}", e))
    })?;

    let mut cmd = Command::new(executable);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err));
    #[cfg(unix)]
    cmd.process_group(0);
    #[cfg(windows)]
    cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);

    let child = cmd
        .spawn()
        .map_err(|e| SupervisorError::spawn_failed(name.as_str(), e.to_string()))?;
    let pid = child.id().ok_or_else(|| {
        SupervisorError::spawn_failed(name.as_str(), "process exited before a pid was observed")
    })?;

    info!(name = %name, pid, log = %log_path.display(), "spawned daemon process");
    Ok(pid)
}
