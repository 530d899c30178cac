//! Shared progress of a library reconciliation run.
//!
//! One [`ScanTracker`] exists per run. The reconciler is its only writer;
//! HTTP handlers and CLI callers read consistent snapshots through clones of
//! the same tracker.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Share of the progress bar covered by per-file work. The remainder belongs
/// to orphan-thumbnail cleanup.
pub const FILE_PHASE_SHARE: f64 = 0.95;

/// Snapshot of a reconciliation run, in the shape polled by clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Fraction of work done, in `[0, 1]`.
    pub progress: f64,
    /// Human-readable status line.
    pub status: String,
    pub completed: bool,
    pub total_files: usize,
    pub processed_files: usize,
}

/// Single-writer, multi-reader progress record of one run.
#[derive(Debug, Clone, Default)]
pub struct ScanTracker {
    inner: Arc<RwLock<ScanProgress>>,
}

impl ScanTracker {
    /// A fresh tracker at zero progress.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a consistent copy of the current state.
    pub fn snapshot(&self) -> ScanProgress {
        self.inner.read().clone()
    }

    /// Whether the run has finished, successfully or not.
    pub fn is_completed(&self) -> bool {
        self.inner.read().completed
    }

    /// Replace the status line without moving progress.
    pub fn set_status(&self, status: impl Into<String>) {
        self.inner.write().status = status.into();
    }

    /// Record how many files the run will process.
    pub fn set_total(&self, total: usize) {
        self.inner.write().total_files = total;
    }

    /// Move progress forward. Values below the current progress are ignored
    /// so a run never appears to go backwards.
    pub fn advance(&self, progress: f64, status: impl Into<String>) {
        let mut state = self.inner.write();
        let progress = progress.clamp(0.0, 1.0);
        if progress > state.progress {
            state.progress = progress;
        }
        state.status = status.into();
    }

    /// Record that one more file was handled (processed, skipped or failed).
    pub fn file_done(&self) {
        let mut state = self.inner.write();
        state.processed_files += 1;
        let (processed, total) = (state.processed_files, state.total_files);
        if total > 0 {
            let progress = (processed as f64 / total as f64).min(1.0) * FILE_PHASE_SHARE;
            if progress > state.progress {
                state.progress = progress;
            }
        }
        state.status = format!("Processing file {}/{}...", processed, total);
    }

    /// Mark the run completed at full progress with a final status.
    pub fn finish(&self, status: impl Into<String>) {
        let mut state = self.inner.write();
        state.progress = 1.0;
        state.completed = true;
        state.status = status.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tracker_is_reset() {
        let tracker = ScanTracker::new();
        assert_eq!(tracker.snapshot(), ScanProgress::default());
        assert!(!tracker.is_completed());
    }

    #[test]
    fn test_progress_is_monotonic() {
        let tracker = ScanTracker::new();
        tracker.advance(0.5, "half");
        tracker.advance(0.2, "earlier");
        let snap = tracker.snapshot();
        assert_eq!(snap.progress, 0.5);
        assert_eq!(snap.status, "earlier");

        tracker.advance(7.0, "over");
        assert_eq!(tracker.snapshot().progress, 1.0);
    }

    #[test]
    fn test_file_done_counts() {
        let tracker = ScanTracker::new();
        tracker.set_total(4);
        tracker.file_done();
        tracker.file_done();

        let snap = tracker.snapshot();
        assert_eq!(snap.processed_files, 2);
        assert_eq!(snap.total_files, 4);
        assert!((snap.progress - 0.5 * FILE_PHASE_SHARE).abs() < 1e-9);
        assert_eq!(snap.status, "Processing file 2/4...");
    }

    #[test]
    fn test_finish() {
        let tracker = ScanTracker::new();
        let reader = tracker.clone();
        tracker.finish("Scan failed: disk gone");

        let snap = reader.snapshot();
        assert!(snap.completed);
        assert_eq!(snap.progress, 1.0);
        assert_eq!(snap.status, "Scan failed: disk gone");
    }

    #[test]
    fn test_snapshot_serializes_polling_shape() {
        let json = serde_json::to_value(ScanTracker::new().snapshot()).unwrap();
        for key in ["progress", "status", "completed", "total_files", "processed_files"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
