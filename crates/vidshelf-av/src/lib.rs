//! # vidshelf-av
//!
//! Media probing and still-frame extraction for video files.
//!
//! This crate provides functionality for:
//! - Probing media files with ffprobe to extract duration and stream info
//! - Grabbing a scaled JPEG frame with ffmpeg for thumbnails
//! - Detecting the external tools it depends on
//!
//! ## Features
//!
//! - `probe` (default) - Probing using the ffprobe CLI
//! - `tracing` - Enable tracing support
//!
//! ## Example
//!
//! ```no_run
//! use vidshelf_av::probe;
//!
//! let info = probe("/path/to/video.mkv")?;
//! println!("Duration: {:?}", info.duration_secs());
//! # Ok::<(), vidshelf_av::Error>(())
//! ```

mod error;
pub mod probe;
pub mod thumbnail;
pub mod tools;

// Re-exports
pub use error::{Error, Result};
pub use probe::{AudioTrack, Ffprobe, MediaInfo, VideoTrack};
pub use thumbnail::FrameGrab;
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};

/// Probe a media file with the `ffprobe` found on `PATH`.
pub fn probe<P: AsRef<std::path::Path>>(path: P) -> Result<MediaInfo> {
    probe::probe_with_ffprobe(path.as_ref())
}
