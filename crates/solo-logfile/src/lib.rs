//! # solo-logfile
//!
//! Log artifact handling for daemon-mode processes: size-threshold
//! rotation with a single-generation backup, whole-file and last-N reads,
//! and a polling live-follow that emits complete lines as they are
//! appended.

use solo_common::{Result, SupervisorError};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tracing::{debug, warn};

/// Size threshold above which a live log is rotated before a new process
/// for its name starts.
pub const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Interval between size polls in follow mode.
pub const FOLLOW_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Rotates `live` to `backup` (replacing any prior backup) if its size
/// exceeds `limit`. Returns true if a rotation happened. A missing live
/// file is a no-op.
pub async fn rotate_if_oversized(live: &Path, backup: &Path, limit: u64) -> Result<bool> {
    let size = match tokio::fs::metadata(live).await {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(SupervisorError::Io(e)),
    };
    if size <= limit {
        return Ok(false);
    }

    tokio::fs::rename(live, backup).await.map_err(SupervisorError::Io)?;
    debug!(live = %live.display(), backup = %backup.display(), size, "rotated oversized log");
    Ok(true)
}

/// Reads every line of the log. A missing file reads as no lines.
pub async fn read_all_lines(path: &Path) -> Result<Vec<String>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SupervisorError::Io(e)),
    };
    Ok(content.lines().map(str::to_string).collect())
}

/// Reads the last `n` lines of the log. A missing file reads as no lines.
pub async fn tail_lines(path: &Path, n: usize) -> Result<Vec<String>> {
    let mut lines = read_all_lines(path).await?;
    if lines.len() > n {
        lines.drain(..lines.len() - n);
    }
    Ok(lines)
}

/// Follows the log: polls the file size, reads only bytes appended since
/// the last observed offset, and calls `emit` once per complete line. A
/// trailing partial line is buffered until its terminator arrives.
///
/// Starts at the current end of file. `keep_going` is consulted after each
/// drain; the follow ends once it returns false, so lines written just
/// before the tracked process disappeared are still delivered.
pub async fn follow(
    path: &Path,
    mut emit: impl FnMut(&str),
    mut keep_going: impl FnMut() -> bool,
) -> Result<()> {
    let mut offset = match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len(),
        Err(_) => 0,
    };
    let mut pending: Vec<u8> = Vec::new();

    loop {
        offset = drain_new_bytes(path, offset, &mut pending, &mut emit).await;
        if !keep_going() {
            return Ok(());
        }
        tokio::time::sleep(FOLLOW_POLL_INTERVAL).await;
    }
}

/// Reads bytes appended past `offset`, emits complete lines, and returns
/// the new offset. Read failures are tolerated; the next poll retries.
async fn drain_new_bytes(
    path: &Path,
    mut offset: u64,
    pending: &mut Vec<u8>,
    emit: &mut impl FnMut(&str),
) -> u64 {
    let size = match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len(),
        Err(_) => return offset,
    };
    if size < offset {
        // The file shrank underneath us (rotation or truncation); start
        // over from the beginning.
        debug!(path = %path.display(), "log file shrank, resetting follow offset");
        offset = 0;
        pending.clear();
    }
    if size == offset {
        return offset;
    }

    let mut file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to open log for follow");
            return offset;
        }
    };
    if file.seek(SeekFrom::Start(offset)).await.is_err() {
        return offset;
    }
    let mut new_bytes = Vec::new();
    match file.read_to_end(&mut new_bytes).await {
        Ok(read) => {
            offset += read as u64;
            pending.extend_from_slice(&new_bytes);
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read appended log bytes");
            return offset;
        }
    }

    while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = pending.drain(..=pos).collect();
        let text = String::from_utf8_lossy(&line[..pos]);
        emit(text.trim_end_matches('\r'));
    }

    offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_tail_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("svc.log");
        tokio::fs::write(&path, "one\ntwo\nthree\nfour\n").await.unwrap();

        assert_eq!(tail_lines(&path, 2).await.unwrap(), vec!["three", "four"]);
        assert_eq!(tail_lines(&path, 10).await.unwrap().len(), 4);
        assert_eq!(read_all_lines(&path).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_missing_log_reads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.log");
        assert!(read_all_lines(&path).await.unwrap().is_empty());
        assert!(tail_lines(&path, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rotation_threshold() {
        let dir = tempdir().unwrap();
        let live = dir.path().join("svc.log");
        let backup = dir.path().join("svc.log.old");

        tokio::fs::write(&live, vec![b'x'; 100]).await.unwrap();
        assert!(!rotate_if_oversized(&live, &backup, 100).await.unwrap());
        assert!(live.exists());

        tokio::fs::write(&live, vec![b'x'; 101]).await.unwrap();
        assert!(rotate_if_oversized(&live, &backup, 100).await.unwrap());
        assert!(!live.exists());
        assert!(backup.exists());
    }

    #[tokio::test]
    async fn test_rotation_replaces_prior_backup() {
        let dir = tempdir().unwrap();
        let live = dir.path().join("svc.log");
        let backup = dir.path().join("svc.log.old");

        tokio::fs::write(&backup, "old backup").await.unwrap();
        tokio::fs::write(&live, "fresh contents!").await.unwrap();
        assert!(rotate_if_oversized(&live, &backup, 4).await.unwrap());
        let contents = tokio::fs::read_to_string(&backup).await.unwrap();
        assert_eq!(contents, "fresh contents!");
    }

    #[tokio::test]
    async fn test_rotation_missing_live_is_noop() {
        let dir = tempdir().unwrap();
        let live = dir.path().join("never.log");
        let backup = dir.path().join("never.log.old");
        assert!(!rotate_if_oversized(&live, &backup, 0).await.unwrap());
    }

    #[tokio::test]
    async fn test_follow_emits_appended_complete_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("svc.log");
        std::fs::write(&path, "earlier\n").unwrap();

        let collected: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        // Appender: one complete line, then a partial line completed later,
        // so partial-line buffering is exercised.
        let appender_path = path.clone();
        let appender = tokio::spawn(async move {
            // Let the follower record its starting offset first.
            tokio::time::sleep(FOLLOW_POLL_INTERVAL * 2).await;
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&appender_path)
                .unwrap();
            write!(file, "alpha\nbe").unwrap();
            file.flush().unwrap();
            tokio::time::sleep(FOLLOW_POLL_INTERVAL * 2).await;
            writeln!(file, "ta").unwrap();
            file.flush().unwrap();
        });

        let emit_lines = Arc::clone(&collected);
        let stop_lines = Arc::clone(&collected);
        follow(
            &path,
            move |line| emit_lines.lock().unwrap().push(line.to_string()),
            move || stop_lines.lock().unwrap().len() < 2,
        )
        .await
        .unwrap();
        appender.await.unwrap();

        let lines = collected.lock().unwrap().clone();
        assert_eq!(lines, vec!["alpha", "beta"]);
    }
}
