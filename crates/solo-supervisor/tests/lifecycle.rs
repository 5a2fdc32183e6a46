//! End-to-end lifecycle tests against real OS processes.
//!
//! These spawn short-lived `sleep` children in daemon mode inside a
//! temporary registry directory and drive them through the supervisor.

#![cfg(unix)]

use solo_common::ProcessName;
use solo_process::{OsDriver, ProcessDriver};
use solo_registry::Registry;
use solo_supervisor::{KillOutcome, StartOptions, StartOutcome, Supervisor, WaitOutcome};
use std::time::Duration;
use tempfile::{tempdir, TempDir};

fn name(s: &str) -> ProcessName {
    ProcessName::new(s).unwrap()
}

fn sleeper(seconds: &str) -> Vec<String> {
    vec!["sleep".to_string(), seconds.to_string()]
}

fn supervisor() -> (Supervisor<OsDriver>, TempDir) {
    let dir = tempdir().unwrap();
    (Supervisor::with_os_driver(Registry::new(dir.path())), dir)
}

/// Polls until the PID reads as dead, tolerating reaping latency.
async fn assert_dies(driver: &OsDriver, pid: u32) {
    for _ in 0..50 {
        if !driver.is_alive(pid) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("pid {} still alive", pid);
}

#[tokio::test]
async fn test_start_replaces_previous_instance() {
    let (supervisor, _dir) = supervisor();
    let svc = name("svc");

    let first = supervisor
        .start(&svc, StartOptions::daemon(sleeper("30")))
        .await
        .unwrap();
    let pid_a = first.pid();
    assert!(supervisor.driver().is_alive(pid_a));

    let second = supervisor
        .start(&svc, StartOptions::daemon(sleeper("30")))
        .await
        .unwrap();
    let pid_b = second.pid();
    assert!(matches!(second, StartOutcome::Started { .. }));
    assert_ne!(pid_a, pid_b);

    // The previous instance is gone; the record tracks the replacement.
    assert_dies(supervisor.driver(), pid_a).await;
    assert!(supervisor.driver().is_alive(pid_b));
    assert_eq!(supervisor.registry().read(&svc).await.unwrap().pid, pid_b);

    let outcome = supervisor.kill(&svc, Duration::from_secs(2)).await.unwrap();
    assert_eq!(outcome, KillOutcome::Killed { pid: pid_b });
}

#[tokio::test]
async fn test_ensure_mode_does_not_restart() {
    let (supervisor, _dir) = supervisor();
    let svc = name("svc");

    let mut opts = StartOptions::daemon(sleeper("30"));
    opts.ensure_only = true;
    let first = supervisor.start(&svc, opts).await.unwrap();
    let pid_a = first.pid();

    let mut opts = StartOptions::daemon(sleeper("30"));
    opts.ensure_only = true;
    let second = supervisor.start(&svc, opts).await.unwrap();

    assert!(matches!(second, StartOutcome::AlreadyRunning { .. }));
    assert_eq!(second.pid(), pid_a);
    assert_eq!(supervisor.registry().read(&svc).await.unwrap().pid, pid_a);

    supervisor.kill(&svc, Duration::from_secs(2)).await.unwrap();
}

#[tokio::test]
async fn test_kill_verified_instance() {
    let (supervisor, _dir) = supervisor();
    let svc = name("svc");

    let started = supervisor
        .start(&svc, StartOptions::daemon(sleeper("30")))
        .await
        .unwrap();
    let pid = started.pid();

    let outcome = supervisor.kill(&svc, Duration::from_secs(2)).await.unwrap();

    assert_eq!(outcome, KillOutcome::Killed { pid });
    assert!(supervisor.registry().read(&svc).await.is_none());
    assert_dies(supervisor.driver(), pid).await;
}

#[tokio::test]
async fn test_wait_for_exit_times_out_on_running_process() {
    let (supervisor, _dir) = supervisor();
    let svc = name("svc");

    supervisor
        .start(&svc, StartOptions::daemon(sleeper("30")))
        .await
        .unwrap();

    let outcome = supervisor
        .wait_for_exit(&svc, Some(Duration::from_millis(300)))
        .await
        .unwrap();
    assert_eq!(outcome, WaitOutcome::TimedOut);

    supervisor.kill(&svc, Duration::from_secs(2)).await.unwrap();
}

#[tokio::test]
async fn test_wait_for_exit_observes_natural_exit() {
    let (supervisor, _dir) = supervisor();
    let svc = name("svc");

    supervisor
        .start(&svc, StartOptions::daemon(sleeper("0.2")))
        .await
        .unwrap();

    let outcome = supervisor
        .wait_for_exit(&svc, Some(Duration::from_secs(10)))
        .await
        .unwrap();
    assert_eq!(outcome, WaitOutcome::Exited);
}

#[tokio::test]
async fn test_daemon_output_lands_in_log() {
    let (supervisor, _dir) = supervisor();
    let svc = name("svc");
    let command = vec![
        "sh".to_string(),
        "-c".to_string(),
        "echo started; echo oops >&2".to_string(),
    ];

    supervisor
        .start(&svc, StartOptions::daemon(command))
        .await
        .unwrap();
    supervisor
        .wait_for_exit(&svc, Some(Duration::from_secs(10)))
        .await
        .unwrap();

    let lines = solo_logfile::read_all_lines(&supervisor.registry().log_path(&svc))
        .await
        .unwrap();
    assert!(lines.contains(&"started".to_string()));
    assert!(lines.contains(&"oops".to_string()));
}
