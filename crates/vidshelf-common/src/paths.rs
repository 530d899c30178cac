//! Path utilities for the video catalog.
//!
//! Catalog records store paths relative to the configured root directory.
//! These helpers decide which files are videos, map extensions to MIME types,
//! and translate between stored paths and absolute paths without letting a
//! stored path escape the root.

use std::path::{Component, Path, PathBuf};

/// Extensions picked up by the library scan.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "wmv", "3gp", "ts", "flv", "webm", "m3u8", "mpeg",
];

/// Check if a path has a video file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use vidshelf_common::paths::is_video_file;
///
/// assert!(is_video_file(Path::new("movie.mkv")));
/// assert!(is_video_file(Path::new("/path/to/clip.3gp")));
/// assert!(!is_video_file(Path::new("subtitle.srt")));
/// ```
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Determine the response content type from a file's extension.
///
/// Unknown extensions map to `application/octet-stream`.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "wmv" => "video/x-ms-wmv",
        "webm" => "video/webm",
        "flv" => "video/x-flv",
        "m4v" => "video/x-m4v",
        "3gp" => "video/3gpp",
        "ts" => "video/mp2t",
        "mpg" | "mpeg" => "video/mpeg",
        _ => "application/octet-stream",
    }
}

/// Normalize a path lexically, resolving `.` and `..` without touching the
/// filesystem (the file may no longer exist).
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Resolve a stored catalog path against the root directory.
///
/// Relative paths are joined onto `root`; absolute paths (written by older
/// versions) are used as-is. Returns `None` when the result lies outside
/// `root`.
pub fn resolve_stored_path(root: &Path, stored: &str) -> Option<PathBuf> {
    let stored = Path::new(stored);
    let joined = if stored.is_absolute() {
        stored.to_path_buf()
    } else {
        root.join(stored)
    };

    let resolved = normalize_lexically(&joined);
    if resolved.starts_with(normalize_lexically(root)) {
        Some(resolved)
    } else {
        None
    }
}

/// Express `path` relative to `root` using `/` separators.
///
/// Returns `None` if `path` is not under `root`.
pub fn relative_to_root(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
