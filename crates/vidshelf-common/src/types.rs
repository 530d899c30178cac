//! Core type definitions for settings and catalog queries.
//!
//! All enums serialize in snake_case so they can be used directly as query
//! parameters and settings-table keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Duration value stored for a video whose probe failed.
pub const UNKNOWN_DURATION: f64 = -1.0;

/// Recognised keys of the settings table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    /// Root directory of the video collection.
    RootDirectory,
    /// Short-video threshold in minutes.
    ShortVideoDuration,
}

impl SettingKey {
    /// All recognised keys.
    pub fn all() -> &'static [SettingKey] {
        &[SettingKey::RootDirectory, SettingKey::ShortVideoDuration]
    }

    /// Key as stored in the settings table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RootDirectory => "root_directory",
            Self::ShortVideoDuration => "short_video_duration",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SettingKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root_directory" => Ok(Self::RootDirectory),
            "short_video_duration" => Ok(Self::ShortVideoDuration),
            _ => Err(format!("Unknown setting key: {}", s)),
        }
    }
}

/// Sort order for catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Filename ascending.
    #[default]
    Filename,
    /// Longest first.
    Duration,
    /// Largest first.
    Size,
    /// Newest first.
    CreatedAt,
    /// Random, optionally reproducible with a seed.
    Random,
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filename => write!(f, "filename"),
            Self::Duration => write!(f, "duration"),
            Self::Size => write!(f, "size"),
            Self::CreatedAt => write!(f, "created_at"),
            Self::Random => write!(f, "random"),
        }
    }
}

impl std::str::FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filename" => Ok(Self::Filename),
            "duration" => Ok(Self::Duration),
            "size" => Ok(Self::Size),
            "created_at" => Ok(Self::CreatedAt),
            "random" => Ok(Self::Random),
            _ => Err(format!("Unknown sort field: {}", s)),
        }
    }
}

/// Duration bucket filter. Videos with unknown duration fall in neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationFilter {
    /// At most the short-video threshold.
    Short,
    /// Longer than the short-video threshold.
    Long,
}

impl fmt::Display for DurationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Short => write!(f, "short"),
            Self::Long => write!(f, "long"),
        }
    }
}
