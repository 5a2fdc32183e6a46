//! # solo-supervisor
//!
//! The lifecycle orchestrator: composes the registry, the identity
//! verifier, the termination engine and the spawner into the user-facing
//! operations (start, kill, kill-all, status, wait, clean, list).
//!
//! The orchestrator is a pure function of (registry contents, driver
//! answers, requested operation): both collaborators are injected, so the
//! whole lifecycle is unit-testable against a temp-dir registry and a
//! mock driver. The only side effects are registry mutations, process
//! creation and signal delivery.

pub mod foreground;
pub mod outcome;

pub use foreground::{supervise_foreground, FORWARD_KILL_TIMEOUT};
pub use outcome::{
    CleanReport, KillAllReport, KillOutcome, ListEntry, StartOutcome, StatusOutcome, WaitOutcome,
};

use solo_common::{ProcessName, Result, SupervisorError};
use solo_logfile::MAX_LOG_SIZE;
use solo_process::{
    spawn_daemon, spawn_foreground, terminate, verify, wait_for_death, OsDriver, ProcessDriver,
    TerminationOutcome, Verification, DEFAULT_GRACE,
};
use solo_registry::Registry;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Options for the start operation.
pub struct StartOptions {
    /// The command line to run (executable first).
    pub command: Vec<String>,
    /// If a verified instance already runs, leave it alone instead of
    /// replacing it.
    pub ensure_only: bool,
    /// Run detached with output captured to the log artifact.
    pub daemon: bool,
    /// Grace period for terminating a prior verified instance.
    pub grace: Duration,
}

impl StartOptions {
    pub fn daemon(command: Vec<String>) -> Self {
        Self {
            command,
            ensure_only: false,
            daemon: true,
            grace: DEFAULT_GRACE,
        }
    }

    pub fn foreground(command: Vec<String>) -> Self {
        Self {
            daemon: false,
            ..Self::daemon(command)
        }
    }
}

/// The lifecycle orchestrator over one registry directory and one process
/// driver.
pub struct Supervisor<D: ProcessDriver> {
    registry: Registry,
    driver: D,
}

impl Supervisor<OsDriver> {
    /// Supervisor backed by the real operating system.
    pub fn with_os_driver(registry: Registry) -> Self {
        Self::new(registry, OsDriver::new())
    }
}

impl<D: ProcessDriver> Supervisor<D> {
    pub fn new(registry: Registry, driver: D) -> Self {
        Self { registry, driver }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Starts (or replaces) the process tracked under `name`.
    ///
    /// A prior record is verified first: a verified live instance is
    /// either kept (`ensure_only`) or terminated before the replacement
    /// spawns; a stale record denotes an unrelated process and is dropped
    /// without signalling anything. The new record is written only after a
    /// successful spawn.
    pub async fn start(&self, name: &ProcessName, opts: StartOptions) -> Result<StartOutcome> {
        if opts.command.is_empty() {
            return Err(SupervisorError::validation("start requires a command to run"));
        }

        if let Some(record) = self.registry.read(name).await {
            match verify(&self.driver, record.pid, record.recorded_at) {
                Verification::Verified if opts.ensure_only => {
                    info!(name = %name, pid = record.pid, "already running, ensure mode keeps it");
                    return Ok(StartOutcome::AlreadyRunning { pid: record.pid });
                }
                Verification::Verified => {
                    info!(name = %name, pid = record.pid, "terminating previous instance");
                    if terminate(&self.driver, record.pid, opts.grace).await
                        == TerminationOutcome::StillAlive
                    {
                        // Best effort: the replacement may still start; the
                        // lingering process is no longer tracked.
                        warn!(
                            name = %name,
                            pid = record.pid,
                            "previous instance survived termination, starting replacement anyway"
                        );
                    }
                }
                Verification::Stale => {
                    warn!(
                        name = %name,
                        pid = record.pid,
                        "recorded pid belongs to a different process, dropping record without signalling"
                    );
                }
                Verification::Dead => {
                    debug!(name = %name, pid = record.pid, "previous instance already gone");
                }
            }
            self.registry.remove(name).await?;
        }

        if opts.daemon {
            let log_path = self.registry.log_path(name);
            solo_logfile::rotate_if_oversized(
                &log_path,
                &self.registry.log_backup_path(name),
                MAX_LOG_SIZE,
            )
            .await?;
            let pid = spawn_daemon(name, &opts.command, &log_path)?;
            self.registry.write(name, pid).await?;
            Ok(StartOutcome::Started { pid, child: None })
        } else {
            let child = spawn_foreground(name, &opts.command)?;
            let pid = child.id().ok_or_else(|| {
                SupervisorError::spawn_failed(
                    name.as_str(),
                    "process exited before a pid was observed",
                )
            })?;
            self.registry.write(name, pid).await?;
            Ok(StartOutcome::Started {
                pid,
                child: Some(child),
            })
        }
    }

    /// Kills the process tracked under `name`.
    ///
    /// Absent records and records pointing at dead or unrelated processes
    /// are cleaned without signalling. Only a verified instance is
    /// terminated; if it survives the escalation the record is kept so a
    /// retry can find it.
    pub async fn kill(&self, name: &ProcessName, grace: Duration) -> Result<KillOutcome> {
        let Some(record) = self.registry.read(name).await else {
            info!(name = %name, "nothing to kill");
            return Ok(KillOutcome::NothingToKill);
        };

        match verify(&self.driver, record.pid, record.recorded_at) {
            Verification::Dead => {
                self.registry.remove(name).await?;
                info!(name = %name, pid = record.pid, "process already gone, removed record");
                Ok(KillOutcome::RemovedDead { pid: record.pid })
            }
            Verification::Stale => {
                self.registry.remove(name).await?;
                info!(
                    name = %name,
                    pid = record.pid,
                    "recorded pid belongs to a different process, removed record"
                );
                Ok(KillOutcome::RemovedStale { pid: record.pid })
            }
            Verification::Verified => match terminate(&self.driver, record.pid, grace).await {
                TerminationOutcome::Dead => {
                    self.registry.remove(name).await?;
                    info!(name = %name, pid = record.pid, "killed");
                    Ok(KillOutcome::Killed { pid: record.pid })
                }
                TerminationOutcome::StillAlive => {
                    warn!(name = %name, pid = record.pid, "kill failed, record kept for retry");
                    Ok(KillOutcome::Failed { pid: record.pid })
                }
            },
        }
    }

    /// Applies the per-record kill logic to every registry entry.
    pub async fn kill_all(&self, grace: Duration) -> Result<KillAllReport> {
        let mut report = KillAllReport::default();
        for record in self.registry.list().await? {
            let outcome = self.kill(&record.name, grace).await?;
            report.outcomes.push((record.name, outcome));
        }
        Ok(report)
    }

    /// Reports the tracked state of `name` without mutating anything.
    pub async fn status(&self, name: &ProcessName) -> StatusOutcome {
        let Some(record) = self.registry.read(name).await else {
            return StatusOutcome::NotTracked;
        };
        match verify(&self.driver, record.pid, record.recorded_at) {
            Verification::Verified => StatusOutcome::Running { pid: record.pid },
            Verification::Dead => StatusOutcome::Stopped { pid: record.pid },
            Verification::Stale => StatusOutcome::StalePid { pid: record.pid },
        }
    }

    /// Waits until the PID tracked under `name` is no longer alive.
    ///
    /// Liveness-only: waiting is non-destructive, so no identity check is
    /// applied and clock-tolerance edge cases cannot produce false
    /// negatives. `timeout` of `None` waits indefinitely.
    pub async fn wait_for_exit(
        &self,
        name: &ProcessName,
        timeout: Option<Duration>,
    ) -> Result<WaitOutcome> {
        let record = self
            .registry
            .read(name)
            .await
            .ok_or_else(|| SupervisorError::not_tracked(name.as_str()))?;

        if !solo_process::pid_in_range(record.pid) {
            return Ok(WaitOutcome::Exited);
        }
        if wait_for_death(&self.driver, record.pid, timeout).await {
            Ok(WaitOutcome::Exited)
        } else {
            Ok(WaitOutcome::TimedOut)
        }
    }

    /// Removes every record (and its log artifacts) whose verification is
    /// stale or dead. Verified records are untouched.
    pub async fn clean(&self) -> Result<CleanReport> {
        let mut report = CleanReport::default();
        for entry in self.list().await? {
            match entry.verification {
                Verification::Verified => report.kept += 1,
                Verification::Stale | Verification::Dead => {
                    self.registry.remove(&entry.record.name).await?;
                    self.registry.remove_artifacts(&entry.record.name).await;
                    info!(name = %entry.record.name, pid = entry.record.pid, "cleaned record");
                    report.removed.push(entry.record.name);
                }
            }
        }
        Ok(report)
    }

    /// Enumerates every record with its current verification.
    pub async fn list(&self) -> Result<Vec<ListEntry>> {
        let mut entries = Vec::new();
        for record in self.registry.list().await? {
            let verification = verify(&self.driver, record.pid, record.recorded_at);
            entries.push(ListEntry {
                record,
                verification,
            });
        }
        Ok(entries)
    }
}
