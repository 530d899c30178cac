//! FFprobe-based media probing.

use super::types::*;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    #[serde(default)]
    format_name: String,
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    channels: Option<u32>,
    duration: Option<String>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    language: Option<String>,
}

/// An ffprobe executable.
#[derive(Debug, Clone)]
pub struct Ffprobe {
    binary: PathBuf,
}

impl Default for Ffprobe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl Ffprobe {
    /// Use the given executable name or path.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Path or name of the executable.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Probe a media file.
    pub fn probe(&self, path: &Path) -> Result<MediaInfo> {
        if !path.exists() {
            return Err(Error::file_not_found(path));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(path = %path.display(), "running ffprobe");

        let output = Command::new(&self.binary)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool_not_found("ffprobe")
                } else {
                    Error::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::tool_failed("ffprobe", stderr.to_string()));
        }

        let json_str = String::from_utf8(output.stdout)
            .map_err(|e| Error::parse_error("ffprobe", format!("Invalid UTF-8: {}", e)))?;

        parse_ffprobe_json(path, &json_str)
    }
}

/// Probe a media file with the `ffprobe` found on `PATH`.
pub fn probe_with_ffprobe(path: &Path) -> Result<MediaInfo> {
    Ffprobe::default().probe(path)
}

fn parse_duration(s: Option<String>) -> Option<Duration> {
    s.and_then(|s| s.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

fn parse_ffprobe_json(path: &Path, json: &str) -> Result<MediaInfo> {
    let output: FfprobeOutput = serde_json::from_str(json)?;

    let mut info = MediaInfo {
        file_path: path.to_path_buf(),
        file_size: output.format.size.and_then(|s| s.parse().ok()).unwrap_or(0),
        container: output.format.format_name,
        duration: parse_duration(output.format.duration),
        video_tracks: Vec::new(),
        audio_tracks: Vec::new(),
    };

    let mut video_index = 0u32;
    let mut audio_index = 0u32;

    for stream in output.streams {
        match stream.codec_type.as_str() {
            "video" => {
                info.video_tracks.push(VideoTrack {
                    index: video_index,
                    codec: stream.codec_name.unwrap_or_default(),
                    width: stream.width.unwrap_or(0),
                    height: stream.height.unwrap_or(0),
                    frame_rate: stream.r_frame_rate.and_then(|s| parse_frame_rate(&s)),
                    duration: parse_duration(stream.duration),
                });
                video_index += 1;
            }
            "audio" => {
                info.audio_tracks.push(AudioTrack {
                    index: audio_index,
                    codec: stream.codec_name.unwrap_or_default(),
                    channels: stream.channels.unwrap_or(2),
                    language: stream.tags.language,
                });
                audio_index += 1;
            }
            _ => {}
        }
    }

    Ok(info)
}

fn parse_frame_rate(rate_str: &str) -> Option<f64> {
    let parts: Vec<&str> = rate_str.split('/').collect();
    if parts.len() == 2 {
        let num: f64 = parts[0].parse().ok()?;
        let den: f64 = parts[1].parse().ok()?;
        if den != 0.0 {
            return Some(num / den);
        }
    }
    rate_str.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264", "width": 1920,
             "height": 1080, "r_frame_rate": "24000/1001", "duration": "61.5"},
            {"index": 1, "codec_type": "audio", "codec_name": "aac", "channels": 6,
             "tags": {"language": "eng"}},
            {"index": 2, "codec_type": "subtitle", "codec_name": "subrip"}
        ],
        "format": {"filename": "a.mkv", "format_name": "matroska,webm",
                   "duration": "62.000000", "size": "1048576"}
    }"#;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("24000/1001"), Some(23.976023976023978));
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("invalid"), None);
    }

    #[test]
    fn test_parse_output() {
        let info = parse_ffprobe_json(Path::new("a.mkv"), SAMPLE).unwrap();
        assert_eq!(info.container, "matroska,webm");
        assert_eq!(info.file_size, 1048576);
        assert_eq!(info.duration_secs(), Some(62.0));
        assert_eq!(info.video_tracks.len(), 1);
        assert_eq!(info.audio_tracks[0].channels, 6);
        assert_eq!(info.audio_tracks[0].language.as_deref(), Some("eng"));
        assert_eq!(info.primary_video().unwrap().width, 1920);
    }

    #[test]
    fn test_duration_falls_back_to_video_stream() {
        let json = r#"{
            "streams": [{"codec_type": "video", "codec_name": "vp9", "duration": "12.5"}],
            "format": {"format_name": "webm", "duration": "0.000000"}
        }"#;
        let info = parse_ffprobe_json(Path::new("a.webm"), json).unwrap();
        assert_eq!(info.duration_secs(), Some(12.5));

        let json = r#"{"streams": [], "format": {"format_name": "mpegts"}}"#;
        let info = parse_ffprobe_json(Path::new("a.ts"), json).unwrap();
        assert_eq!(info.duration_secs(), None);
    }

    #[test]
    fn test_missing_file() {
        let err = Ffprobe::default()
            .probe(Path::new("/nonexistent/vidshelf/a.mp4"))
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.mp4");
        std::fs::write(&file, b"not a video").unwrap();

        let err = Ffprobe::new("/nonexistent/bin/ffprobe")
            .probe(&file)
            .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }
}
