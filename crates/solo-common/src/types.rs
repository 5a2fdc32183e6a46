//! Domain types shared across the solo workspace.

use crate::errors::{Result, SupervisorError};
use std::fmt;
use std::str::FromStr;

/// Maximum accepted length for a logical process name.
pub const MAX_NAME_LEN: usize = 64;

/// Logical name under which a process is tracked.
///
/// The name doubles as a file stem inside the registry directory, so it is
/// constrained to a filesystem-safe character set at construction time:
/// alphanumerics plus `-`, `_` and `.`, no path separators, no `..`
/// traversal sequences, at most [`MAX_NAME_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessName(String);

impl ProcessName {
    /// Creates a validated process name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(SupervisorError::validation("process name cannot be empty"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(SupervisorError::validation(format!(
                "process name exceeds {} characters: '{}'",
                MAX_NAME_LEN, name
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(SupervisorError::validation(format!(
                "process name may only contain alphanumerics, hyphens, underscores and dots: '{}'",
                name
            )));
        }
        if name.contains("..") {
            return Err(SupervisorError::validation(format!(
                "process name may not contain '..': '{}'",
                name
            )));
        }

        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ProcessName {
    type Err = SupervisorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for ProcessName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
