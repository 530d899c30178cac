//! Internal Rust models matching the database schema.
//!
//! This module provides strongly-typed Rust structures that map to database tables.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vidshelf_common::{DurationFilter, SortBy, VideoId, UNKNOWN_DURATION};

/// Cataloged video record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Video {
    pub id: VideoId,
    pub filename: String,
    /// Path relative to the root directory (older rows may hold an absolute path).
    pub filepath: String,
    /// Size in megabytes, rounded to two decimals.
    pub size: f64,
    /// Duration in seconds, or [`UNKNOWN_DURATION`] when probing failed.
    pub duration: f64,
    pub thumbnail_path: Option<String>,
    pub thumbnail_generated: bool,
    pub is_favorite: bool,
    pub web_playable: bool,
    pub last_position: f64,
    pub watch_progress: f64,
    pub last_watched_at: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// Map a row selected with [`crate::queries::videos::COLS`].
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: VideoId::from(row.get::<_, i64>(0)?),
            filename: row.get(1)?,
            filepath: row.get(2)?,
            size: row.get(3)?,
            duration: row.get(4)?,
            thumbnail_path: row.get(5)?,
            thumbnail_generated: row.get::<_, i32>(6)? != 0,
            is_favorite: row.get::<_, i32>(7)? != 0,
            web_playable: row.get::<_, i32>(8)? != 0,
            last_position: row.get(9)?,
            watch_progress: row.get(10)?,
            last_watched_at: row
                .get::<_, Option<String>>(11)?
                .as_deref()
                .and_then(parse_timestamp),
            is_completed: row.get::<_, i32>(12)? != 0,
            created_at: parse_timestamp(&row.get::<_, String>(13)?).unwrap_or_else(Utc::now),
            updated_at: parse_timestamp(&row.get::<_, String>(14)?).unwrap_or_else(Utc::now),
        })
    }

    /// Watch progress fields of this record.
    pub fn progress(&self) -> WatchProgress {
        WatchProgress {
            video_id: self.id,
            last_position: self.last_position,
            watch_progress: self.watch_progress,
            last_watched_at: self.last_watched_at,
            is_completed: self.is_completed,
        }
    }
}

/// Format a timestamp the way every table stores it.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored RFC 3339 timestamp.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Metadata extracted by the scanner for one file, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedVideo {
    pub filename: String,
    pub filepath: String,
    pub size: f64,
    pub duration: f64,
}

impl ScannedVideo {
    /// Whether the probe failed for this file.
    pub fn duration_unknown(&self) -> bool {
        self.duration == UNKNOWN_DURATION
    }
}

/// Watch progress snapshot for one video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchProgress {
    pub video_id: VideoId,
    pub last_position: f64,
    pub watch_progress: f64,
    pub last_watched_at: Option<DateTime<Utc>>,
    pub is_completed: bool,
}

/// A raw settings-table row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

/// Typed view over the settings table.
#[derive(Debug, Clone, PartialEq)]
pub struct LibrarySettings {
    pub root_directory: Option<PathBuf>,
    /// Short-video threshold in minutes.
    pub short_video_minutes: f64,
}

/// Default short-video threshold in minutes.
pub const DEFAULT_SHORT_VIDEO_MINUTES: f64 = 5.0;

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            root_directory: None,
            short_video_minutes: DEFAULT_SHORT_VIDEO_MINUTES,
        }
    }
}

/// Outcome of writing one scanned file to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(VideoId),
    Updated(VideoId),
}

impl UpsertOutcome {
    pub fn id(&self) -> VideoId {
        match self {
            Self::Inserted(id) | Self::Updated(id) => *id,
        }
    }
}

/// Filters for catalog listings.
#[derive(Debug, Clone, Default)]
pub struct VideoFilter {
    /// Case-insensitive filename substring.
    pub keyword: Option<String>,
    pub favorite: Option<bool>,
    pub duration: Option<DurationFilter>,
    /// Short-video threshold in minutes used by `duration`.
    pub short_video_minutes: f64,
    pub sort_by: SortBy,
    /// Seed for reproducible [`SortBy::Random`] ordering.
    pub seed: Option<i64>,
}

/// Offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub skip: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { skip: 0, limit: 12 }
    }
}

/// One page of a catalog listing.
#[derive(Debug, Clone, Serialize)]
pub struct VideoPage {
    pub total: i64,
    pub total_pages: i64,
    pub items: Vec<Video>,
}

impl VideoPage {
    pub fn new(total: i64, limit: u32, items: Vec<Video>) -> Self {
        let limit = i64::from(limit.max(1));
        Self {
            total,
            total_pages: (total + limit - 1) / limit,
            items,
        }
    }
}
