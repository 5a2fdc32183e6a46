//! The escalating termination engine.
//!
//! Graceful shutdown handlers in arbitrary child processes can take
//! meaningfully long, so termination runs as a two-phase escalation with
//! independent timeouts: graceful signal, timed wait, forceful signal,
//! timed wait. All waiting is cooperative sleep-and-recheck polling.

use crate::driver::ProcessDriver;
use crate::validation::pid_in_range;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Default grace period between the graceful request and the force kill.
pub const DEFAULT_GRACE: Duration = Duration::from_millis(5000);

/// Fixed wait window after the forceful request.
pub const FORCE_WAIT: Duration = Duration::from_millis(2000);

/// Interval between liveness polls while waiting for a process to die.
pub const LIVENESS_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Final state of a termination attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// The process is confirmed not running, whether it was already dead or
    /// was killed by this attempt.
    Dead,
    /// The process survived the full escalation.
    StillAlive,
}

/// Terminates `pid` with escalation: graceful signal, wait up to `grace`,
/// forceful signal, wait up to [`FORCE_WAIT`].
///
/// Idempotent: an already-dead PID returns [`TerminationOutcome::Dead`]
/// immediately. Signal delivery failures are not fatal; the process may
/// have exited between the probe and the signal, and the polling loop
/// settles the real outcome either way. Out-of-range PIDs never reach an
/// OS call and report `Dead`.
pub async fn terminate<D: ProcessDriver + ?Sized>(
    driver: &D,
    pid: u32,
    grace: Duration,
) -> TerminationOutcome {
    if !pid_in_range(pid) {
        debug!(pid, "refusing to terminate out-of-range pid");
        return TerminationOutcome::Dead;
    }
    if !driver.is_alive(pid) {
        return TerminationOutcome::Dead;
    }

    debug!(pid, grace_ms = grace.as_millis() as u64, "sending graceful termination request");
    if let Err(e) = driver.signal_term(pid) {
        debug!(pid, error = %e, "graceful signal delivery failed, continuing");
    }
    if wait_for_death(driver, pid, Some(grace)).await {
        return TerminationOutcome::Dead;
    }

    warn!(pid, "grace period expired, force killing");
    if let Err(e) = driver.signal_kill(pid) {
        debug!(pid, error = %e, "forceful signal delivery failed, continuing");
    }
    if wait_for_death(driver, pid, Some(FORCE_WAIT)).await {
        TerminationOutcome::Dead
    } else {
        warn!(pid, "process still alive after forceful termination");
        TerminationOutcome::StillAlive
    }
}

/// Polls liveness every [`LIVENESS_POLL_INTERVAL`] until the process dies
/// or `timeout` elapses. `None` waits indefinitely.
///
/// Returns true if the process was observed dead.
pub async fn wait_for_death<D: ProcessDriver + ?Sized>(
    driver: &D,
    pid: u32,
    timeout: Option<Duration>,
) -> bool {
    let deadline = timeout.map(|t| Instant::now() + t);

    loop {
        if !driver.is_alive(pid) {
            return true;
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return false;
            }
        }
        sleep(LIVENESS_POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDriver, MockProcess, SignalKind};
    use chrono::Utc;

    #[tokio::test(start_paused = true)]
    async fn test_already_dead_is_noop() {
        let driver = MockDriver::new();
        let outcome = terminate(&driver, 100, DEFAULT_GRACE).await;
        assert_eq!(outcome, TerminationOutcome::Dead);
        assert!(driver.signals().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_pid_is_dead() {
        let driver = MockDriver::new();
        driver.add(100, MockProcess::responsive(Some(Utc::now())));
        let outcome = terminate(&driver, crate::PID_MAX + 1, DEFAULT_GRACE).await;
        assert_eq!(outcome, TerminationOutcome::Dead);
        assert!(driver.signals().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_responsive_process_dies_gracefully() {
        let driver = MockDriver::new();
        driver.add(100, MockProcess::responsive(Some(Utc::now())));

        let outcome = terminate(&driver, 100, DEFAULT_GRACE).await;

        assert_eq!(outcome, TerminationOutcome::Dead);
        let signals = driver.signals();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::Term);
    }

    #[tokio::test(start_paused = true)]
    async fn test_escalation_ordering() {
        // A process that ignores SIGTERM entirely and only dies on SIGKILL.
        let driver = MockDriver::new();
        driver.add(100, MockProcess::stubborn(Some(Utc::now())));
        let grace = Duration::from_millis(700);

        let started = Instant::now();
        let outcome = terminate(&driver, 100, grace).await;

        assert_eq!(outcome, TerminationOutcome::Dead);
        let signals = driver.signals();
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].kind, SignalKind::Term);
        assert_eq!(signals[1].kind, SignalKind::Kill);
        // The force kill must not be sent before the grace period elapsed.
        assert!(signals[1].at - started >= grace);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unkillable_process_reports_still_alive() {
        let driver = MockDriver::new();
        driver.add(100, MockProcess::immortal(Some(Utc::now())));

        let outcome = terminate(&driver, 100, Duration::from_millis(300)).await;

        assert_eq!(outcome, TerminationOutcome::StillAlive);
        let signals = driver.signals();
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[1].kind, SignalKind::Kill);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_death_timeout() {
        let driver = MockDriver::new();
        driver.add(100, MockProcess::immortal(Some(Utc::now())));
        assert!(!wait_for_death(&driver, 100, Some(Duration::from_millis(350))).await);

        driver.mark_dead(100);
        assert!(wait_for_death(&driver, 100, Some(Duration::from_millis(350))).await);
    }
}
