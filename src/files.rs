//! Retrying filesystem mutations for user-initiated delete and rename.
//!
//! Media players on some platforms hold files open for a moment after
//! playback stops, so removal and rename are attempted a few times before the
//! failure is surfaced with a hint.

use std::path::Path;
use std::time::Duration;

use vidshelf_common::{Error, Result};

/// Attempts made before giving up.
pub const ATTEMPTS: u32 = 3;

/// Delay between attempts.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Appended to failures that are likely caused by a lock on the file.
pub const IN_USE_HINT: &str = "make sure no other program such as a player is using the file";

/// Remove a file, retrying on failure. A file that is already gone counts as
/// removed.
pub async fn safe_remove(path: &Path) -> Result<()> {
    safe_remove_with(path, ATTEMPTS, RETRY_DELAY).await
}

pub async fn safe_remove_with(path: &Path, attempts: u32, delay: Duration) -> Result<()> {
    let mut last_err = None;
    for attempt in 1..=attempts.max(1) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                tracing::warn!(file = %path.display(), attempt, error = %e, "Failed to remove file");
                last_err = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
    Err(Error::io(format!(
        "Failed to delete {}: {}; {}",
        path.display(),
        last_err.map(|e| e.to_string()).unwrap_or_default(),
        IN_USE_HINT
    )))
}

/// Rename a file, retrying on failure. Refuses to overwrite an existing
/// target.
pub async fn rename_with_retry(from: &Path, to: &Path) -> Result<()> {
    rename_with_retry_using(from, to, ATTEMPTS, RETRY_DELAY).await
}

pub async fn rename_with_retry_using(
    from: &Path,
    to: &Path,
    attempts: u32,
    delay: Duration,
) -> Result<()> {
    if !tokio::fs::try_exists(from).await.unwrap_or(false) {
        return Err(Error::not_found(format!("File not found: {}", from.display())));
    }
    if tokio::fs::try_exists(to).await.unwrap_or(false) {
        return Err(Error::conflict(format!(
            "A file named {} already exists",
            to.display()
        )));
    }

    let mut last_err = None;
    for attempt in 1..=attempts.max(1) {
        match tokio::fs::rename(from, to).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::warn!(
                    from = %from.display(),
                    to = %to.display(),
                    attempt,
                    error = %e,
                    "Failed to rename file"
                );
                last_err = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
    Err(Error::io(format!(
        "Failed to rename {}: {}; {}",
        from.display(),
        last_err.map(|e| e.to_string()).unwrap_or_default(),
        IN_USE_HINT
    )))
}
