//! Process identity verification.
//!
//! A registry record is only a belief: the OS may have recycled the PID
//! after the recorded process exited. Before any destructive action the
//! record is re-checked against the OS-reported start time of whatever
//! currently holds that PID.

use crate::driver::ProcessDriver;
use crate::validation::pid_in_range;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

/// Maximum accepted skew between a record's write time and the OS-reported
/// process start time for the record to still count as "the same process".
///
/// The two timestamps are set independently (filesystem clock at record
/// write, OS at process creation) and drift apart by spawn-to-persist
/// latency, so some slack is required. Tunable: under heavily loaded
/// schedulers or very slow filesystems a legitimately-just-started process
/// could exceed this and be misclassified as stale.
pub const START_TIME_TOLERANCE: Duration = Duration::from_millis(5000);

/// The verifier's judgment about a registry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// The PID is alive and its start time is consistent with the record:
    /// with high confidence this is the process we started.
    Verified,
    /// The PID is alive but provably (or unprovably) not ours: its start
    /// time falls outside the tolerance window, or could not be determined.
    /// Must never be signalled.
    Stale,
    /// No process currently runs under the PID.
    Dead,
}

/// Decides whether `pid` still denotes the process instance recorded at
/// `recorded_at`.
///
/// Any failure to learn about the process resolves toward "not ours":
/// out-of-range PIDs and dead PIDs are `Dead`, an alive PID without a
/// determinable start time is `Stale`.
pub fn verify<D: ProcessDriver + ?Sized>(
    driver: &D,
    pid: u32,
    recorded_at: DateTime<Utc>,
) -> Verification {
    if !pid_in_range(pid) {
        return Verification::Dead;
    }
    if !driver.is_alive(pid) {
        return Verification::Dead;
    }

    let Some(started) = driver.start_time(pid) else {
        debug!(pid, "process alive but start time undeterminable, treating as stale");
        return Verification::Stale;
    };

    let skew_ms = (started - recorded_at).num_milliseconds().unsigned_abs();
    if skew_ms <= START_TIME_TOLERANCE.as_millis() as u64 {
        Verification::Verified
    } else {
        debug!(
            pid,
            skew_ms, "start time inconsistent with record, PID reuse suspected"
        );
        Verification::Stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDriver, MockProcess};
    use crate::validation::PID_MAX;
    use chrono::TimeDelta;

    const TOLERANCE_MS: i64 = START_TIME_TOLERANCE.as_millis() as i64;

    #[test]
    fn test_dead_pid() {
        let driver = MockDriver::new();
        assert_eq!(verify(&driver, 100, Utc::now()), Verification::Dead);
    }

    #[test]
    fn test_out_of_range_pid_is_dead_without_probe() {
        let driver = MockDriver::new();
        assert_eq!(verify(&driver, 0, Utc::now()), Verification::Dead);
        assert_eq!(verify(&driver, PID_MAX + 1, Utc::now()), Verification::Dead);
        assert!(driver.signals().is_empty());
    }

    #[test]
    fn test_alive_without_start_time_is_stale() {
        let driver = MockDriver::new();
        driver.add(100, MockProcess::responsive(None));
        assert_eq!(verify(&driver, 100, Utc::now()), Verification::Stale);
    }

    #[test]
    fn test_matching_start_time_is_verified() {
        let now = Utc::now();
        let driver = MockDriver::new();
        driver.add(100, MockProcess::responsive(Some(now)));
        assert_eq!(verify(&driver, 100, now), Verification::Verified);
    }

    #[test]
    fn test_tolerance_boundary() {
        let recorded_at = Utc::now();

        // Exactly at the tolerance threshold: still verified.
        let at_threshold = recorded_at + TimeDelta::milliseconds(TOLERANCE_MS);
        let driver = MockDriver::new();
        driver.add(100, MockProcess::responsive(Some(at_threshold)));
        assert_eq!(verify(&driver, 100, recorded_at), Verification::Verified);

        // One millisecond above: stale.
        let above = recorded_at + TimeDelta::milliseconds(TOLERANCE_MS + 1);
        let driver = MockDriver::new();
        driver.add(100, MockProcess::responsive(Some(above)));
        assert_eq!(verify(&driver, 100, recorded_at), Verification::Stale);
    }

    #[test]
    fn test_tolerance_is_symmetric() {
        let recorded_at = Utc::now();
        // Start time before the record write (the usual direction).
        let before = recorded_at - TimeDelta::milliseconds(TOLERANCE_MS);
        let driver = MockDriver::new();
        driver.add(100, MockProcess::responsive(Some(before)));
        assert_eq!(verify(&driver, 100, recorded_at), Verification::Verified);

        let too_old = recorded_at - TimeDelta::milliseconds(TOLERANCE_MS + 1);
        let driver = MockDriver::new();
        driver.add(100, MockProcess::responsive(Some(too_old)));
        assert_eq!(verify(&driver, 100, recorded_at), Verification::Stale);
    }
}
