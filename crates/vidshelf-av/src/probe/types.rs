//! Media information types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Information about a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Path to the media file.
    pub file_path: PathBuf,
    /// File size in bytes.
    pub file_size: u64,
    /// Container format names reported by ffprobe (e.g., "matroska,webm").
    pub container: String,
    /// Container-level duration, when known.
    pub duration: Option<Duration>,
    /// Video tracks in the file.
    pub video_tracks: Vec<VideoTrack>,
    /// Audio tracks in the file.
    pub audio_tracks: Vec<AudioTrack>,
}

impl MediaInfo {
    /// Playable duration in seconds.
    ///
    /// Prefers a positive container duration and falls back to the first
    /// video track's duration.
    pub fn duration_secs(&self) -> Option<f64> {
        let positive = |d: &Duration| d.as_secs_f64() > 0.0;
        self.duration
            .filter(positive)
            .or_else(|| {
                self.video_tracks
                    .first()
                    .and_then(|t| t.duration)
                    .filter(positive)
            })
            .map(|d| d.as_secs_f64())
    }

    /// Get the primary video track (first video track).
    pub fn primary_video(&self) -> Option<&VideoTrack> {
        self.video_tracks.first()
    }
}

/// Information about a video track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoTrack {
    /// Track index among video tracks.
    pub index: u32,
    /// Video codec (e.g., "hevc", "h264").
    pub codec: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frame rate in FPS.
    pub frame_rate: Option<f64>,
    /// Stream-level duration, when the container reports none.
    pub duration: Option<Duration>,
}

/// Information about an audio track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioTrack {
    /// Track index among audio tracks.
    pub index: u32,
    /// Audio codec (e.g., "aac", "opus").
    pub codec: String,
    /// Number of channels.
    pub channels: u32,
    /// Language code.
    pub language: Option<String>,
}
