//! # solo-common
//!
//! Shared foundation for the solo workspace: the error taxonomy used by
//! every operation, and the validated [`ProcessName`] key under which a
//! tracked process is registered.

pub mod errors;
pub mod types;

pub use errors::{Result, SupervisorError};
pub use types::{ProcessName, MAX_NAME_LEN};
