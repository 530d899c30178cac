//! Metadata extraction for the reconciler.
//!
//! Workers call a [`MetadataProbe`] from blocking tasks; they only read the
//! filesystem and never touch the database.

use std::path::{Path, PathBuf};

use vidshelf_av::Ffprobe;
use vidshelf_common::{Error, Result, UNKNOWN_DURATION};
use vidshelf_db::models::ScannedVideo;

/// Bytes per megabyte used for catalog sizes.
const BYTES_PER_MB: f64 = 1_048_576.0;

/// Source of playable durations.
pub trait MetadataProbe: Send + Sync {
    /// Duration of the file in seconds.
    fn duration(&self, path: &Path) -> Result<f64>;
}

/// Probe backed by the ffprobe CLI.
#[derive(Debug, Clone, Default)]
pub struct FfprobeProbe {
    ffprobe: Ffprobe,
}

impl FfprobeProbe {
    /// Use the given ffprobe executable.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: Ffprobe::new(binary),
        }
    }
}

impl MetadataProbe for FfprobeProbe {
    fn duration(&self, path: &Path) -> Result<f64> {
        let info = self
            .ffprobe
            .probe(path)
            .map_err(|e| Error::probe_failed(e.to_string()))?;
        info.duration_secs()
            .ok_or_else(|| Error::probe_failed(format!("no valid duration in {}", path.display())))
    }
}

/// Megabytes rounded to two decimals.
pub fn size_in_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

/// Extracted metadata plus whether the probe failed.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub video: ScannedVideo,
    pub probe_error: Option<String>,
}

/// Stat and probe one file.
///
/// A probe failure is not an error: the file is reported with
/// [`UNKNOWN_DURATION`]. Only a failed stat is.
pub fn extract(probe: &dyn MetadataProbe, absolute: &Path, relative: &str) -> Result<Extracted> {
    let metadata = std::fs::metadata(absolute)?;
    let filename = absolute
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::invalid_input(format!("no file name: {}", absolute.display())))?;

    let (duration, probe_error) = match probe.duration(absolute) {
        Ok(d) if d > 0.0 => (d, None),
        Ok(d) => (UNKNOWN_DURATION, Some(format!("non-positive duration {d}"))),
        Err(e) => (UNKNOWN_DURATION, Some(e.to_string())),
    };

    Ok(Extracted {
        video: ScannedVideo {
            filename,
            filepath: relative.to_string(),
            size: size_in_mb(metadata.len()),
            duration,
        },
        probe_error,
    })
}
