//! Typed results of supervisor operations.
//!
//! Each operation returns an outcome the CLI maps onto messages and exit
//! codes; the supervisor itself never prints or exits.

use solo_common::ProcessName;
use solo_process::Verification;
use solo_registry::RegistryRecord;
use tokio::process::Child;

/// Result of a start operation.
pub enum StartOutcome {
    /// An ensure-mode start found a verified live instance and left it
    /// alone.
    AlreadyRunning { pid: u32 },
    /// A new process was spawned and recorded. `child` is present in
    /// foreground mode, where the caller supervises it until exit.
    Started { pid: u32, child: Option<Child> },
}

impl StartOutcome {
    pub fn pid(&self) -> u32 {
        match self {
            Self::AlreadyRunning { pid } | Self::Started { pid, .. } => *pid,
        }
    }
}

/// Result of a kill operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    /// No record existed; nothing to do.
    NothingToKill,
    /// The record pointed at a PID that is no longer running; the record
    /// was removed without signalling anything.
    RemovedDead { pid: u32 },
    /// The record's PID is alive but belongs to a different process; the
    /// record was removed and the process left untouched.
    RemovedStale { pid: u32 },
    /// The verified process was terminated and the record removed.
    Killed { pid: u32 },
    /// The verified process survived the full escalation; the record is
    /// intentionally left in place so a retry can find it.
    Failed { pid: u32 },
}

impl KillOutcome {
    /// True unless the process survived the escalation.
    pub fn is_clean(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Aggregate result of a kill-all operation.
#[derive(Debug, Default)]
pub struct KillAllReport {
    pub outcomes: Vec<(ProcessName, KillOutcome)>,
}

impl KillAllReport {
    /// True only if every record ended cleaned.
    pub fn all_clean(&self) -> bool {
        self.outcomes.iter().all(|(_, o)| o.is_clean())
    }
}

/// Result of a status query. Side-effect free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// No record exists for the name.
    NotTracked,
    /// The recorded process is alive and identity-verified.
    Running { pid: u32 },
    /// The recorded PID is not running.
    Stopped { pid: u32 },
    /// The recorded PID is running but belongs to a different process
    /// (PID reuse suspected). The record is left in place.
    StalePid { pid: u32 },
}

/// Result of waiting for a tracked process to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Exited,
    TimedOut,
}

/// Result of a clean sweep.
#[derive(Debug, Default)]
pub struct CleanReport {
    /// Names whose stale or dead records (and log artifacts) were removed.
    pub removed: Vec<ProcessName>,
    /// Count of verified-live records left untouched.
    pub kept: usize,
}

/// One row of a registry listing.
#[derive(Debug, Clone)]
pub struct ListEntry {
    pub record: RegistryRecord,
    pub verification: Verification,
}
