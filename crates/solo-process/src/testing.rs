//! Scriptable in-memory [`ProcessDriver`] for tests.
//!
//! The mock holds a table of fake processes with configurable start times
//! and signal behavior, and records every delivered signal with a
//! timestamp so tests can assert on escalation ordering.

use crate::driver::ProcessDriver;
use chrono::{DateTime, Utc};
use solo_common::Result;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::time::Instant;

/// Which signal a driver call delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Term,
    Kill,
}

/// One recorded signal delivery.
#[derive(Debug, Clone, Copy)]
pub struct SignalRecord {
    pub pid: u32,
    pub kind: SignalKind,
    pub at: Instant,
}

/// A fake process entry.
#[derive(Debug, Clone, Copy)]
pub struct MockProcess {
    pub alive: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub dies_on_term: bool,
    pub dies_on_kill: bool,
}

impl MockProcess {
    /// A well-behaved process: exits on the graceful request.
    pub fn responsive(start_time: Option<DateTime<Utc>>) -> Self {
        Self {
            alive: true,
            start_time,
            dies_on_term: true,
            dies_on_kill: true,
        }
    }

    /// Ignores the graceful request, dies on the forceful one.
    pub fn stubborn(start_time: Option<DateTime<Utc>>) -> Self {
        Self {
            dies_on_term: false,
            ..Self::responsive(start_time)
        }
    }

    /// Survives everything.
    pub fn immortal(start_time: Option<DateTime<Utc>>) -> Self {
        Self {
            dies_on_term: false,
            dies_on_kill: false,
            ..Self::responsive(start_time)
        }
    }
}

#[derive(Default)]
struct MockState {
    procs: HashMap<u32, MockProcess>,
    signals: Vec<SignalRecord>,
}

/// Scriptable driver. PIDs not added to the table read as not running.
#[derive(Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fake process under `pid`.
    pub fn add(&self, pid: u32, process: MockProcess) {
        self.state.lock().unwrap().procs.insert(pid, process);
    }

    /// Marks a registered process as no longer running.
    pub fn mark_dead(&self, pid: u32) {
        if let Some(p) = self.state.lock().unwrap().procs.get_mut(&pid) {
            p.alive = false;
        }
    }

    /// All signals delivered so far, in order.
    pub fn signals(&self) -> Vec<SignalRecord> {
        self.state.lock().unwrap().signals.clone()
    }

    /// Signals delivered to one PID, in order.
    pub fn signals_for(&self, pid: u32) -> Vec<SignalRecord> {
        self.signals().into_iter().filter(|s| s.pid == pid).collect()
    }
}

impl ProcessDriver for MockDriver {
    fn is_alive(&self, pid: u32) -> bool {
        self.state
            .lock()
            .unwrap()
            .procs
            .get(&pid)
            .is_some_and(|p| p.alive)
    }

    fn start_time(&self, pid: u32) -> Option<DateTime<Utc>> {
        let state = self.state.lock().unwrap();
        let process = state.procs.get(&pid)?;
        if !process.alive {
            return None;
        }
        process.start_time
    }

    fn signal_term(&self, pid: u32) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.signals.push(SignalRecord {
            pid,
            kind: SignalKind::Term,
            at: Instant::now(),
        });
        if let Some(p) = state.procs.get_mut(&pid) {
            if p.dies_on_term {
                p.alive = false;
            }
        }
        Ok(())
    }

    fn signal_kill(&self, pid: u32) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.signals.push(SignalRecord {
            pid,
            kind: SignalKind::Kill,
            at: Instant::now(),
        });
        if let Some(p) = state.procs.get_mut(&pid) {
            if p.dies_on_kill {
                p.alive = false;
            }
        }
        Ok(())
    }
}
