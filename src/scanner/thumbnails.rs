//! Thumbnail storage and orphan collection.
//!
//! Thumbnails live flat in one directory under deterministic names derived
//! from the video's stored path: `{stem}_{hash}_thumb.jpg`, where `hash` is
//! the first 8 hex characters of the SHA-256 of the path. Records store the
//! file name relative to the directory; absolute paths written by older
//! versions are still honoured.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use vidshelf_av::FrameGrab;
use vidshelf_db::models::Video;

/// Suffix shared by every managed thumbnail file.
pub const THUMB_SUFFIX: &str = "_thumb.jpg";

/// Files and bytes removed by a cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupStats {
    pub count: usize,
    pub bytes: u64,
}

/// Directory of thumbnail files.
#[derive(Debug, Clone)]
pub struct ThumbnailStore {
    dir: PathBuf,
}

impl ThumbnailStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic file name for a video's stored path.
    pub fn expected_name(filepath: &str) -> String {
        let base = filepath.rsplit(['/', '\\']).next().unwrap_or(filepath);
        let stem = match base.rfind('.') {
            Some(i) if i > 0 => &base[..i],
            _ => base,
        };
        let digest = Sha256::digest(filepath.as_bytes());
        format!(
            "{}_{}{}",
            sanitize_stem(stem),
            hex::encode(&digest[..4]),
            THUMB_SUFFIX
        )
    }

    /// Absolute location of the expected thumbnail for a stored path.
    pub fn expected_path(&self, filepath: &str) -> PathBuf {
        self.dir.join(Self::expected_name(filepath))
    }

    /// Resolve a stored `thumbnail_path` to a file location.
    pub fn resolve(&self, stored: &str) -> PathBuf {
        let p = Path::new(stored);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.dir.join(p)
        }
    }

    /// Existing thumbnail file of a record, if any.
    pub fn existing(&self, video: &Video) -> Option<PathBuf> {
        video
            .thumbnail_path
            .as_deref()
            .map(|s| self.resolve(s))
            .filter(|p| p.is_file())
    }

    /// Delete the thumbnail a record points at. Returns the bytes freed, or
    /// `None` when there was nothing to delete.
    pub fn remove_for(&self, video: &Video) -> std::io::Result<Option<u64>> {
        let Some(path) = self.existing(video) else {
            return Ok(None);
        };
        let bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        std::fs::remove_file(&path)?;
        Ok(Some(bytes))
    }

    /// Grab a frame from `source` into the expected location, replacing any
    /// other file the record pointed at. Returns the value to store in
    /// `thumbnail_path`.
    pub fn generate(&self, video: &Video, source: &Path, grab: &FrameGrab) -> Result<String> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create thumbnail directory: {:?}", self.dir))?;

        let name = Self::expected_name(&video.filepath);
        let target = self.dir.join(&name);
        self.remove_stale(video, &target);

        grab.extract(source, &target)
            .with_context(|| format!("Failed to extract frame from {:?}", source))?;
        Ok(name)
    }

    /// Store uploaded image bytes under the expected name.
    pub fn store_upload(&self, video: &Video, data: &[u8]) -> Result<String> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create thumbnail directory: {:?}", self.dir))?;

        let name = Self::expected_name(&video.filepath);
        let target = self.dir.join(&name);
        self.remove_stale(video, &target);

        std::fs::write(&target, data)
            .with_context(|| format!("Failed to write thumbnail: {:?}", target))?;
        Ok(name)
    }

    fn remove_stale(&self, video: &Video, target: &Path) {
        if let Some(old) = self.existing(video) {
            if old != target {
                if let Err(e) = std::fs::remove_file(&old) {
                    tracing::warn!(path = %old.display(), error = %e, "Failed to remove old thumbnail");
                }
            }
        }
    }

    /// Delete managed thumbnail files no live record accounts for.
    ///
    /// A file is kept when its name is the expected name of any record, or
    /// the file name of any record's stored `thumbnail_path`. Only files
    /// ending in [`THUMB_SUFFIX`] are ever considered.
    pub fn collect_orphans(&self, videos: &[Video]) -> std::io::Result<CleanupStats> {
        let mut stats = CleanupStats::default();
        if !self.dir.is_dir() {
            return Ok(stats);
        }

        let mut keep: HashSet<String> = HashSet::with_capacity(videos.len() * 2);
        for video in videos {
            keep.insert(Self::expected_name(&video.filepath));
            if let Some(stored) = video.thumbnail_path.as_deref() {
                if let Some(name) = Path::new(stored).file_name() {
                    keep.insert(name.to_string_lossy().into_owned());
                }
            }
        }

        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(THUMB_SUFFIX) || keep.contains(&name) {
                continue;
            }
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            match std::fs::remove_file(entry.path()) {
                Ok(()) => {
                    tracing::debug!(file = %name, "Removed orphaned thumbnail");
                    stats.count += 1;
                    stats.bytes += metadata.len();
                }
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "Failed to remove orphaned thumbnail");
                }
            }
        }

        Ok(stats)
    }
}

fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned
    }
}
