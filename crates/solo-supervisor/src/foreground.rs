//! Foreground child supervision.
//!
//! When a tracked process runs attached to the terminal, the invocation
//! waits on it, forwards termination signals so the child can run its own
//! cleanup, and force-kills after a fixed safety net so a non-cooperating
//! child cannot hang the supervisor forever.

use crate::Supervisor;
use solo_common::{ProcessName, Result, SupervisorError};
use solo_process::ProcessDriver;
use std::time::Duration;
use tokio::process::Child;
use tracing::{debug, info, warn};

/// How long a child gets to exit after a forwarded termination signal
/// before it is force-killed.
pub const FORWARD_KILL_TIMEOUT: Duration = Duration::from_secs(5);

/// Supervises a foreground child until it exits, forwarding interrupt and
/// terminate signals. Returns the child's exit code; the registry record
/// is removed once the child is gone.
pub async fn supervise_foreground<D: ProcessDriver>(
    supervisor: &Supervisor<D>,
    name: &ProcessName,
    mut child: Child,
) -> Result<i32> {
    let pid = child.id().ok_or_else(|| {
        SupervisorError::spawn_failed(name.as_str(), "process exited before a pid was observed")
    })?;

    let status = wait_with_forwarding(supervisor.driver(), pid, &mut child).await?;

    // The child is gone; drop the record so the name reads as untracked.
    supervisor.registry().remove(name).await?;

    let code = status.code().unwrap_or(1);
    info!(name = %name, pid, code, "foreground process exited");
    Ok(code)
}

#[cfg(unix)]
async fn wait_with_forwarding<D: ProcessDriver>(
    driver: &D,
    pid: u32,
    child: &mut Child,
) -> Result<std::process::ExitStatus> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).map_err(SupervisorError::Io)?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(SupervisorError::Io)?;

    tokio::select! {
        status = child.wait() => return status.map_err(SupervisorError::Io),
        _ = sigterm.recv() => {
            debug!(pid, "forwarding SIGTERM to foreground child");
        }
        _ = sigint.recv() => {
            debug!(pid, "forwarding SIGINT to foreground child");
        }
    }

    if let Err(e) = driver.signal_term(pid) {
        debug!(pid, error = %e, "signal forwarding failed, child may already be gone");
    }
    escalate_after_forward(driver, pid, child).await
}

#[cfg(windows)]
async fn wait_with_forwarding<D: ProcessDriver>(
    driver: &D,
    pid: u32,
    child: &mut Child,
) -> Result<std::process::ExitStatus> {
    tokio::select! {
        status = child.wait() => return status.map_err(SupervisorError::Io),
        _ = tokio::signal::ctrl_c() => {
            debug!(pid, "forwarding Ctrl+C to foreground child");
        }
    }

    if let Err(e) = driver.signal_term(pid) {
        debug!(pid, error = %e, "signal forwarding failed, child may already be gone");
    }
    escalate_after_forward(driver, pid, child).await
}

/// Safety net after a forwarded signal: give the child a fixed window to
/// exit on its own, then force-kill it.
async fn escalate_after_forward<D: ProcessDriver>(
    driver: &D,
    pid: u32,
    child: &mut Child,
) -> Result<std::process::ExitStatus> {
    match tokio::time::timeout(FORWARD_KILL_TIMEOUT, child.wait()).await {
        Ok(status) => status.map_err(SupervisorError::Io),
        Err(_) => {
            warn!(pid, "child ignored forwarded signal, force killing");
            if let Err(e) = driver.signal_kill(pid) {
                debug!(pid, error = %e, "force kill delivery failed");
            }
            child.wait().await.map_err(SupervisorError::Io)
        }
    }
}
