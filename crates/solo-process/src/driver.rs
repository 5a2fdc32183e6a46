//! The process capability layer.
//!
//! All OS-facing mechanics (liveness probing, start-time inspection, signal
//! delivery) sit behind [`ProcessDriver`], so the verifier and the
//! termination engine are written once against the trait and tested against
//! a scriptable mock.

use chrono::{DateTime, Utc};
use solo_common::Result;
use sysinfo::{ProcessRefreshKind, RefreshKind, System};

/// Platform capabilities the core logic needs from the operating system.
///
/// Methods are synchronous thin wrappers over single syscalls; the polling
/// loops that compose them live above this trait.
pub trait ProcessDriver: Send + Sync {
    /// Non-destructive liveness probe.
    ///
    /// A probe that fails for an unexpected reason reports `false`: the
    /// callers act destructively only on processes proven alive, so the
    /// safe answer to "could not check" is "not running".
    fn is_alive(&self, pid: u32) -> bool;

    /// OS-reported start time of the process, if it is running and the OS
    /// can report one.
    fn start_time(&self, pid: u32) -> Option<DateTime<Utc>>;

    /// Deliver the graceful termination request (SIGTERM on Unix), tree-wide
    /// where the platform supports it.
    fn signal_term(&self, pid: u32) -> Result<()>;

    /// Deliver the forceful termination request (SIGKILL on Unix), tree-wide
    /// where the platform supports it.
    fn signal_kill(&self, pid: u32) -> Result<()>;
}

/// The real OS-backed driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsDriver;

impl OsDriver {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessDriver for OsDriver {
    fn is_alive(&self, pid: u32) -> bool {
        #[cfg(unix)]
        {
            is_alive_unix(pid)
        }

        #[cfg(windows)]
        {
            is_alive_windows(pid)
        }
    }

    fn start_time(&self, pid: u32) -> Option<DateTime<Utc>> {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_processes(ProcessRefreshKind::everything()),
        );
        let process = system.process(sysinfo::Pid::from_u32(pid))?;
        let secs = process.start_time();
        if secs == 0 {
            // Some platforms report 0 when the start time is unknown.
            return None;
        }
        DateTime::from_timestamp(secs as i64, 0)
    }

    fn signal_term(&self, pid: u32) -> Result<()> {
        #[cfg(unix)]
        {
            deliver_unix(pid, nix::sys::signal::Signal::SIGTERM)
        }

        #[cfg(windows)]
        {
            // Windows has no SIGTERM equivalent for detached processes;
            // graceful and forceful requests both terminate the process.
            self.signal_kill(pid)
        }
    }

    fn signal_kill(&self, pid: u32) -> Result<()> {
        #[cfg(unix)]
        {
            deliver_unix(pid, nix::sys::signal::Signal::SIGKILL)
        }

        #[cfg(windows)]
        {
            force_kill_windows(pid)
        }
    }
}

#[cfg(unix)]
fn is_alive_unix(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    use tracing::warn;

    match kill(Pid::from_raw(pid as i32), None) {
        Ok(_) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        // Process exists but we lack permission to signal it.
        Err(nix::errno::Errno::EPERM) => true,
        Err(e) => {
            warn!(pid, error = %e, "liveness probe failed, treating as not running");
            false
        }
    }
}

/// Signal delivery on Unix.
///
/// Children spawned by solo lead their own process group (pgid == pid), so
/// group delivery is tried first to reach descendants; processes that do not
/// lead a group get plain single-PID delivery. A process that vanished
/// between the probe and the signal counts as delivered.
#[cfg(unix)]
fn deliver_unix(pid: u32, signal: nix::sys::signal::Signal) -> Result<()> {
    use nix::sys::signal::{kill, killpg};
    use nix::unistd::Pid;
    use solo_common::SupervisorError;

    let target = Pid::from_raw(pid as i32);
    if killpg(target, signal).is_ok() {
        return Ok(());
    }

    match kill(target, signal) {
        Ok(()) => Ok(()),
        Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(SupervisorError::signal(pid, e.to_string())),
    }
}

#[cfg(windows)]
fn is_alive_windows(pid: u32) -> bool {
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION};

    unsafe {
        match OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) {
            Ok(handle) => {
                let _ = CloseHandle(handle);
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(windows)]
fn force_kill_windows(pid: u32) -> Result<()> {
    use solo_common::SupervisorError;
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

    unsafe {
        let handle = match OpenProcess(PROCESS_TERMINATE, false, pid) {
            Ok(h) if !h.is_invalid() => h,
            // Unable to open: the process is gone or inaccessible. Treated
            // as delivered; the polling loop settles the actual outcome.
            _ => return Ok(()),
        };

        let result = TerminateProcess(handle, 1);
        let _ = CloseHandle(handle);

        result.map_err(|e| SupervisorError::signal(pid, format!("TerminateProcess failed: {}", e)))
    }
}
