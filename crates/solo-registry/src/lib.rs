//! # solo-registry
//!
//! The filesystem-backed registry mapping a logical name to its last-known
//! PID. One `<name>.pid` file per tracked name inside a dot-prefixed
//! directory; the file content is the decimal PID and the file's
//! last-modified time serves as the record timestamp (no separate field is
//! persisted).
//!
//! The registry is shared, unsynchronized state across tool invocations.
//! Records are beliefs, not ground truth: callers must re-verify a PID
//! before acting destructively on it.

use chrono::{DateTime, Utc};
use solo_common::{ProcessName, Result, SupervisorError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default registry directory, relative to the current working directory.
pub const DEFAULT_REGISTRY_DIR: &str = ".solo";

const PID_EXTENSION: &str = "pid";
const LOG_EXTENSION: &str = "log";
const LOG_BACKUP_EXTENSION: &str = "log.old";

/// One registry entry: a name, the PID recorded for it, and the record's
/// last-write time.
#[derive(Debug, Clone)]
pub struct RegistryRecord {
    pub name: ProcessName,
    pub pid: u32,
    pub recorded_at: DateTime<Utc>,
}

/// Handle on a registry directory. Cheap to clone; holds no open files.
#[derive(Debug, Clone)]
pub struct Registry {
    dir: PathBuf,
}

impl Registry {
    /// Creates a registry handle for an explicit directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates a registry handle for the default dot-directory under the
    /// current working directory.
    pub fn in_current_dir() -> Self {
        Self::new(PathBuf::from(DEFAULT_REGISTRY_DIR))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the PID file for `name`.
    pub fn pid_path(&self, name: &ProcessName) -> PathBuf {
        self.dir.join(format!("{}.{}", name, PID_EXTENSION))
    }

    /// Path of the log artifact for `name` (daemon-mode output).
    pub fn log_path(&self, name: &ProcessName) -> PathBuf {
        self.dir.join(format!("{}.{}", name, LOG_EXTENSION))
    }

    /// Path of the single-generation log backup for `name`.
    pub fn log_backup_path(&self, name: &ProcessName) -> PathBuf {
        self.dir.join(format!("{}.{}", name, LOG_BACKUP_EXTENSION))
    }

    /// Writes (or overwrites) the record for `name`, creating the registry
    /// directory on first use. Write failures are fatal: the caller needs
    /// to know tracking state may be inconsistent.
    pub async fn write(&self, name: &ProcessName, pid: u32) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            SupervisorError::registry(
                name.as_str(),
                format!("failed to create directory {}: {}", self.dir.display(), e),
            )
        })?;

        let path = self.pid_path(name);
        tokio::fs::write(&path, format!("{}\n", pid))
            .await
            .map_err(|e| {
                SupervisorError::registry(
                    name.as_str(),
                    format!("failed to write {}: {}", path.display(), e),
                )
            })?;

        debug!(name = %name, pid, "wrote registry record");
        Ok(())
    }

    /// Reads the record for `name`.
    ///
    /// Every read-side failure (missing file, unreadable content, a PID
    /// that does not parse) is reported as absence: a record that cannot be
    /// read tracks nothing.
    pub async fn read(&self, name: &ProcessName) -> Option<RegistryRecord> {
        let path = self.pid_path(name);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(name = %name, error = %e, "failed to read registry record, treating as absent");
                return None;
            }
        };
        let pid = match content.trim().parse::<u32>() {
            Ok(pid) => pid,
            Err(_) => {
                warn!(name = %name, path = %path.display(), "registry record holds a non-numeric pid, treating as absent");
                return None;
            }
        };
        let modified = match tokio::fs::metadata(&path).await.and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) => {
                warn!(name = %name, error = %e, "registry record has no readable mtime, treating as absent");
                return None;
            }
        };

        Some(RegistryRecord {
            name: name.clone(),
            pid,
            recorded_at: DateTime::<Utc>::from(modified),
        })
    }

    /// Removes the record for `name`. Removing an absent record is a no-op.
    pub async fn remove(&self, name: &ProcessName) -> Result<()> {
        let path = self.pid_path(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(name = %name, "removed registry record");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SupervisorError::registry(
                name.as_str(),
                format!("failed to remove {}: {}", path.display(), e),
            )),
        }
    }

    /// Removes the log artifacts for `name`, best-effort.
    pub async fn remove_artifacts(&self, name: &ProcessName) {
        for path in [self.log_path(name), self.log_backup_path(name)] {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(name = %name, path = %path.display(), error = %e, "failed to remove log artifact");
                }
            }
        }
    }

    /// Enumerates every readable record in the registry. A missing registry
    /// directory is an empty registry; unparseable entries are skipped with
    /// a warning.
    pub async fn list(&self) -> Result<Vec<RegistryRecord>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SupervisorError::registry(
                    self.dir.display().to_string(),
                    format!("failed to read registry directory: {}", e),
                ))
            }
        };

        let mut records = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "failed to read registry directory entry, stopping enumeration");
                    break;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PID_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let name = match ProcessName::new(stem) {
                Ok(name) => name,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping registry entry with invalid name");
                    continue;
                }
            };
            if let Some(record) = self.read(&name).await {
                records.push(record);
            }
        }

        records.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn name(s: &str) -> ProcessName {
        ProcessName::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_record_round_trip() {
        let dir = tempdir().unwrap();
        let registry = Registry::new(dir.path());

        registry.write(&name("app"), 4242).await.unwrap();
        let record = registry.read(&name("app")).await.unwrap();
        assert_eq!(record.pid, 4242);

        let age = Utc::now() - record.recorded_at;
        assert!(age.num_seconds() >= 0 && age.num_seconds() < 10);

        registry.remove(&name("app")).await.unwrap();
        assert!(registry.read(&name("app")).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let dir = tempdir().unwrap();
        let registry = Registry::new(dir.path());
        registry.remove(&name("ghost")).await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_record_reads_as_absent() {
        let dir = tempdir().unwrap();
        let registry = Registry::new(dir.path());
        tokio::fs::write(registry.pid_path(&name("bad")), "not-a-pid\n")
            .await
            .unwrap();
        assert!(registry.read(&name("bad")).await.is_none());
    }

    #[tokio::test]
    async fn test_list_enumerates_pid_files_only() {
        let dir = tempdir().unwrap();
        let registry = Registry::new(dir.path());

        registry.write(&name("a"), 1111).await.unwrap();
        registry.write(&name("b"), 2222).await.unwrap();
        tokio::fs::write(dir.path().join("b.log"), "noise").await.unwrap();
        tokio::fs::write(dir.path().join("stray.txt"), "noise").await.unwrap();

        let records = registry.list().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name.as_str(), "a");
        assert_eq!(records[0].pid, 1111);
        assert_eq!(records[1].name.as_str(), "b");
        assert_eq!(records[1].pid, 2222);
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let registry = Registry::new(dir.path().join("never-created"));
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_updates_pid() {
        let dir = tempdir().unwrap();
        let registry = Registry::new(dir.path());

        registry.write(&name("app"), 100).await.unwrap();
        registry.write(&name("app"), 200).await.unwrap();
        assert_eq!(registry.read(&name("app")).await.unwrap().pid, 200);
    }
}
