//! # solo-process
//!
//! OS process capabilities for the solo workspace:
//!
//! - the [`ProcessDriver`] capability trait (liveness, start time, graceful
//!   and forceful signalling) with its platform implementation [`OsDriver`]
//! - PID range validation
//! - the identity verifier deciding whether a recorded PID still denotes
//!   the process instance it was recorded for
//! - the escalating termination engine (signal, timed wait, force kill)
//! - process spawning in foreground and daemon modes

pub mod driver;
pub mod spawn;
pub mod terminate;
pub mod validation;
pub mod verify;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use driver::{OsDriver, ProcessDriver};
pub use spawn::{spawn_daemon, spawn_foreground};
pub use terminate::{
    terminate, wait_for_death, TerminationOutcome, DEFAULT_GRACE, FORCE_WAIT,
    LIVENESS_POLL_INTERVAL,
};
pub use validation::{pid_in_range, validate_pid, PID_MAX};
pub use verify::{verify, Verification, START_TIME_TOLERANCE};
