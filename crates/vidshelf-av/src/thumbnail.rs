//! Still-frame extraction with the ffmpeg CLI.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Options for grabbing a single frame.
#[derive(Debug, Clone)]
pub struct FrameGrab {
    /// Path or name of the ffmpeg executable.
    pub ffmpeg: PathBuf,
    /// Seek position in seconds.
    pub at_secs: f64,
    /// Output width in pixels; height keeps the aspect ratio.
    pub width: u32,
}

impl Default for FrameGrab {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            at_secs: 1.0,
            width: 320,
        }
    }
}

impl FrameGrab {
    /// Arguments passed to ffmpeg, excluding the executable.
    pub fn args(&self, input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-ss".to_string(),
            format!("{:.3}", self.at_secs),
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "-vf".to_string(),
            format!("scale={}:-1", self.width),
            "-frames:v".to_string(),
            "1".to_string(),
            output.to_string_lossy().into_owned(),
        ]
    }

    /// Write one JPEG frame of `input` to `output`, overwriting it.
    pub fn extract(&self, input: &Path, output: &Path) -> Result<()> {
        if !input.exists() {
            return Err(Error::file_not_found(input));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(input = %input.display(), output = %output.display(), "extracting frame");

        let result = Command::new(&self.ffmpeg)
            .args(self.args(input, output))
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool_not_found("ffmpeg")
                } else {
                    Error::Io(e)
                }
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::tool_failed("ffmpeg", stderr.trim().to_string()));
        }

        if !output.exists() {
            return Err(Error::tool_failed("ffmpeg", "no frame written"));
        }

        Ok(())
    }
}
