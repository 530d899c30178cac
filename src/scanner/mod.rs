//! Library reconciler.
//!
//! A run brings the catalog in line with the files under the root directory:
//! records whose file disappeared are pruned, new or modified files are
//! probed by a small worker pool and written back in batches, and thumbnails
//! no record accounts for are removed. All progress flows through a
//! [`ScanTracker`].

pub mod prober;
pub mod thumbnails;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};
use vidshelf_common::paths::{is_video_file, relative_to_root, resolve_stored_path};
use vidshelf_db::{
    models::{ScannedVideo, UpsertOutcome, Video},
    pool::{get_conn, DbPool},
    queries::videos,
};
use walkdir::WalkDir;

use crate::state::{ScanTracker, FILE_PHASE_SHARE};

pub use prober::{FfprobeProbe, MetadataProbe};
pub use thumbnails::{CleanupStats, ThumbnailStore};

/// Fewest and most extraction workers per batch.
const MIN_WORKERS: usize = 2;
const MAX_WORKERS: usize = 4;

/// Status of a run started without a root directory.
pub const ROOT_NOT_SET: &str = "Root directory is not set";

/// Status of a run over a root with no video files.
pub const NO_VIDEO_FILES: &str = "No video files found";

/// Batch and worker sizing of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub batch_size: usize,
    pub workers: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            workers: MIN_WORKERS,
        }
    }
}

impl ScanOptions {
    pub fn new(batch_size: usize, workers: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            workers: workers.clamp(MIN_WORKERS, MAX_WORKERS),
        }
    }
}

/// Counters of one finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub files_found: usize,
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Files cataloged with an unknown duration.
    pub probe_failures: usize,
    pub pruned: usize,
    pub thumbnails_removed: usize,
    pub thumbnail_bytes_removed: u64,
}

impl ScanSummary {
    /// Whether the run changed nothing in the catalog.
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.pruned == 0
    }

    fn status(&self) -> String {
        format!(
            "Scan complete: {} found, {} added, {} updated, {} unchanged, {} removed, {} failed",
            self.files_found, self.added, self.updated, self.skipped, self.pruned, self.failed
        )
    }
}

/// A run executing in the background.
pub struct ScanHandle {
    tracker: ScanTracker,
    task: JoinHandle<ScanSummary>,
}

impl ScanHandle {
    /// Live progress of the run.
    pub fn progress(&self) -> ScanTracker {
        self.tracker.clone()
    }

    /// Wait for the run to finish.
    pub async fn join(self) -> Result<ScanSummary> {
        self.task.await.context("Reconciliation task panicked")
    }
}

/// A file found on disk that needs probing.
struct Candidate {
    absolute: PathBuf,
    relative: String,
}

/// Reconciles the catalog against a root directory.
#[derive(Clone)]
pub struct Reconciler {
    pool: DbPool,
    probe: Arc<dyn MetadataProbe>,
    thumbnails: ThumbnailStore,
    options: ScanOptions,
}

impl Reconciler {
    pub fn new(
        pool: DbPool,
        probe: Arc<dyn MetadataProbe>,
        thumbnails: ThumbnailStore,
        options: ScanOptions,
    ) -> Self {
        Self {
            pool,
            probe,
            thumbnails,
            options: ScanOptions::new(options.batch_size, options.workers),
        }
    }

    pub fn thumbnails(&self) -> &ThumbnailStore {
        &self.thumbnails
    }

    pub fn options(&self) -> ScanOptions {
        self.options
    }

    /// Start a run in the background and return immediately.
    pub fn spawn(&self, root: Option<PathBuf>) -> ScanHandle {
        let tracker = ScanTracker::new();
        tracker.set_status("Starting scan...");
        let this = self.clone();
        let run_tracker = tracker.clone();
        let task = tokio::spawn(async move { this.run(root.as_deref(), &run_tracker).await });
        ScanHandle { tracker, task }
    }

    /// Run to completion. The tracker always ends completed at full
    /// progress, carrying either the summary or the error as its status.
    pub async fn run(&self, root: Option<&Path>, tracker: &ScanTracker) -> ScanSummary {
        let Some(root) = root else {
            warn!("Scan requested without a root directory");
            tracker.finish(ROOT_NOT_SET);
            return ScanSummary::default();
        };

        match self.reconcile(root, tracker).await {
            Ok(summary) => {
                let status = if summary.files_found == 0 {
                    NO_VIDEO_FILES.to_string()
                } else {
                    summary.status()
                };
                info!(
                    root = %root.display(),
                    found = summary.files_found,
                    added = summary.added,
                    updated = summary.updated,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    pruned = summary.pruned,
                    thumbnails_removed = summary.thumbnails_removed,
                    "Library scan complete"
                );
                tracker.finish(status);
                summary
            }
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Library scan failed");
                tracker.finish(format!("Scan failed: {:#}", e));
                ScanSummary::default()
            }
        }
    }

    async fn reconcile(&self, root: &Path, tracker: &ScanTracker) -> Result<ScanSummary> {
        if !root.is_dir() {
            anyhow::bail!("Root directory does not exist: {}", root.display());
        }
        let mut summary = ScanSummary::default();

        tracker.set_status("Removing deleted files...");
        summary.pruned = self.prune_missing(root).await?;

        tracker.set_status("Discovering files...");
        let walk_root = root.to_path_buf();
        let discovered = tokio::task::spawn_blocking(move || discover(&walk_root))
            .await
            .context("File discovery panicked")?;
        summary.files_found = discovered.len();
        tracker.set_total(discovered.len());

        if discovered.is_empty() {
            self.cleanup_thumbnails(tracker, &mut summary).await?;
            return Ok(summary);
        }

        // Batch existence check: one query instead of one lookup per file.
        let known = self.known_update_times().await?;

        let mut pending = Vec::new();
        for (candidate, modified) in discovered {
            let stored = known.get(&candidate.relative).or_else(|| {
                let legacy = candidate.absolute.to_string_lossy().into_owned();
                known.get(&legacy)
            });
            match (stored, modified) {
                (Some(updated_at), Some(modified)) if *updated_at >= modified => {
                    debug!(file = %candidate.relative, "Unchanged, skipping");
                    summary.skipped += 1;
                    tracker.file_done();
                }
                _ => pending.push(candidate),
            }
        }

        for batch in pending.chunks(self.options.batch_size) {
            let extracted = self.extract_batch(batch, tracker, &mut summary).await;
            if !extracted.is_empty() {
                self.commit_batch(extracted, &mut summary).await?;
            }
        }

        self.cleanup_thumbnails(tracker, &mut summary).await?;
        Ok(summary)
    }

    /// Delete records whose file is gone, along with their thumbnails.
    async fn prune_missing(&self, root: &Path) -> Result<usize> {
        let pool = self.pool.clone();
        let thumbnails = self.thumbnails.clone();
        let root = root.to_path_buf();

        tokio::task::spawn_blocking(move || -> Result<usize> {
            let mut conn = get_conn(&pool)?;
            let pruned = prune_records(&mut conn, &root)?;

            // Only touch files once the deletions are durable.
            for video in &pruned {
                if let Err(e) = thumbnails.remove_for(video) {
                    warn!(video_id = %video.id, error = %e, "Failed to remove thumbnail of deleted file");
                }
            }
            Ok(pruned.len())
        })
        .await
        .context("Prune task panicked")?
    }

    async fn known_update_times(&self) -> Result<HashMap<String, DateTime<Utc>>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<HashMap<String, DateTime<Utc>>> {
            let conn = get_conn(&pool)?;
            Ok(videos::list_all_videos(&conn)?
                .into_iter()
                .map(|v| (v.filepath, v.updated_at))
                .collect())
        })
        .await
        .context("Catalog lookup panicked")?
    }

    /// Probe one batch with a bounded worker pool. Workers never touch the
    /// database.
    async fn extract_batch(
        &self,
        batch: &[Candidate],
        tracker: &ScanTracker,
        summary: &mut ScanSummary,
    ) -> Vec<(ScannedVideo, String)> {
        let semaphore = Arc::new(Semaphore::new(self.options.workers));
        let mut set = JoinSet::new();

        for candidate in batch {
            let semaphore = semaphore.clone();
            let probe = self.probe.clone();
            let absolute = candidate.absolute.clone();
            let relative = candidate.relative.clone();

            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let path = absolute.clone();
                let result = tokio::task::spawn_blocking(move || {
                    prober::extract(probe.as_ref(), &absolute, &relative)
                })
                .await;
                (path, result)
            });
        }

        let mut extracted = Vec::with_capacity(batch.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((path, Ok(Ok(item)))) => {
                    if let Some(reason) = &item.probe_error {
                        warn!(file = %path.display(), error = %reason, "Probe failed, keeping file with unknown duration");
                        summary.probe_failures += 1;
                    }
                    extracted.push((item.video, path.to_string_lossy().into_owned()));
                }
                Ok((path, Ok(Err(e)))) => {
                    warn!(file = %path.display(), error = %e, "Failed to read file");
                    summary.failed += 1;
                }
                Ok((path, Err(e))) => {
                    warn!(file = %path.display(), error = %e, "Extraction task panicked");
                    summary.failed += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Extraction worker panicked");
                    summary.failed += 1;
                }
            }
            tracker.file_done();
        }

        extracted
    }

    /// Write one batch in a single transaction.
    async fn commit_batch(
        &self,
        batch: Vec<(ScannedVideo, String)>,
        summary: &mut ScanSummary,
    ) -> Result<()> {
        let pool = self.pool.clone();
        let (added, updated, failed) =
            tokio::task::spawn_blocking(move || -> Result<(usize, usize, usize)> {
                let mut conn = get_conn(&pool)?;
                let tx = conn
                    .transaction_with_behavior(TransactionBehavior::Immediate)
                    .context("Failed to start batch transaction")?;

                let (mut added, mut updated, mut failed) = (0, 0, 0);
                for (scanned, absolute) in &batch {
                    match videos::upsert_scanned_video(&tx, scanned, Some(absolute)) {
                        Ok(UpsertOutcome::Inserted(id)) => {
                            debug!(video_id = %id, file = %scanned.filepath, "Added video");
                            added += 1;
                        }
                        Ok(UpsertOutcome::Updated(id)) => {
                            debug!(video_id = %id, file = %scanned.filepath, "Updated video");
                            updated += 1;
                        }
                        Err(e) => {
                            warn!(file = %scanned.filepath, error = %e, "Failed to save scanned file");
                            failed += 1;
                        }
                    }
                }

                tx.commit().context("Failed to commit batch transaction")?;
                Ok((added, updated, failed))
            })
            .await
            .context("Batch commit panicked")??;

        summary.added += added;
        summary.updated += updated;
        summary.failed += failed;
        Ok(())
    }

    async fn cleanup_thumbnails(
        &self,
        tracker: &ScanTracker,
        summary: &mut ScanSummary,
    ) -> Result<()> {
        tracker.advance(FILE_PHASE_SHARE, "Cleaning orphaned thumbnails...");
        let stats = self.collect_orphans().await?;
        summary.thumbnails_removed = stats.count;
        summary.thumbnail_bytes_removed = stats.bytes;
        Ok(())
    }

    /// Remove thumbnails that no current record accounts for.
    pub async fn collect_orphans(&self) -> Result<CleanupStats> {
        let pool = self.pool.clone();
        let thumbnails = self.thumbnails.clone();
        let stats = tokio::task::spawn_blocking(move || -> Result<CleanupStats> {
            let all = {
                let conn = get_conn(&pool)?;
                videos::list_all_videos(&conn)?
            };
            thumbnails
                .collect_orphans(&all)
                .with_context(|| format!("Failed to clean {}", thumbnails.dir().display()))
        })
        .await
        .context("Thumbnail cleanup panicked")??;

        if stats.count > 0 {
            info!(
                count = stats.count,
                bytes = stats.bytes,
                "Removed orphaned thumbnails"
            );
        }
        Ok(stats)
    }
}

/// Walk the root for video files, with their modification times.
fn discover(root: &Path) -> Vec<(Candidate, Option<DateTime<Utc>>)> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "Error walking directory");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_video_file(entry.path()) {
            continue;
        }
        let Some(relative) = relative_to_root(root, entry.path()) else {
            continue;
        };
        let modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);
        found.push((
            Candidate {
                absolute: entry.path().to_path_buf(),
                relative,
            },
            modified,
        ));
    }
    found.sort_by(|a, b| a.0.relative.cmp(&b.0.relative));
    found
}

/// Delete, in one transaction, every record whose file is gone from `root`.
/// Returns the deleted records.
fn prune_records(conn: &mut Connection, root: &Path) -> Result<Vec<Video>> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .context("Failed to start prune transaction")?;

    let mut pruned = Vec::new();
    for video in videos::list_all_videos(&tx)? {
        let present = resolve_stored_path(root, &video.filepath)
            .map(|p| p.is_file())
            .unwrap_or(false);
        if present {
            continue;
        }
        if videos::delete_video(&tx, video.id)? {
            info!(video_id = %video.id, file = %video.filepath, "Removed record of deleted file");
            pruned.push(video);
        }
    }

    tx.commit().context("Failed to commit prune transaction")?;
    Ok(pruned)
}
