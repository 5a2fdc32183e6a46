//! PID input validation.
//!
//! Registry contents are just text on disk and could hold anything; PIDs
//! are range-checked before they reach any OS call so reserved or nonsense
//! values (0, negatives encoded as huge u32s) are never signalled.

use solo_common::{Result, SupervisorError};

/// Upper bound for accepted PIDs. Matches the Linux `pid_max` ceiling and
/// comfortably covers practical PID ranges on other platforms.
pub const PID_MAX: u32 = 4_194_304;

/// Returns true if `pid` is inside the sane OS PID range.
pub fn pid_in_range(pid: u32) -> bool {
    pid >= 1 && pid <= PID_MAX
}

/// Validates a PID, rejecting values outside `1..=PID_MAX`.
pub fn validate_pid(pid: u32) -> Result<()> {
    if pid_in_range(pid) {
        Ok(())
    } else {
        Err(SupervisorError::validation(format!(
            "pid {} is outside the accepted range 1..={}",
            pid, PID_MAX
        )))
    }
}
