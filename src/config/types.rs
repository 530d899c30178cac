use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub streaming: StreamingConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Directory holding the database and default thumbnail directory.
    pub fn data_dir(&self) -> PathBuf {
        self.server
            .data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join("vidshelf.db")
    }

    pub fn thumbnail_dir(&self) -> PathBuf {
        self.library
            .thumbnail_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("thumbnails"))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the database (default: next to the config file,
    /// or the working directory)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: None,
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Seeds the `root_directory` setting when the database has none
    #[serde(default)]
    pub root_dir: Option<PathBuf>,

    /// Where generated and uploaded thumbnails are stored
    /// (default: `thumbnails` under the data directory)
    #[serde(default)]
    pub thumbnail_dir: Option<PathBuf>,

    /// Seeds the `short_video_duration` setting, in minutes
    #[serde(default = "default_short_video_minutes")]
    pub short_video_minutes: f64,
}

fn default_short_video_minutes() -> f64 {
    5.0
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            thumbnail_dir: None,
            short_video_minutes: default_short_video_minutes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Files extracted per batch; each batch commits once
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Concurrent extraction workers per batch (clamped to 2..=4)
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_batch_size() -> usize {
    10
}
fn default_workers() -> usize {
    4
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            workers: default_workers(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamingConfig {
    /// Abort a stream when no chunk is delivered for this long
    #[serde(default = "default_inactivity_timeout")]
    pub inactivity_timeout_secs: u64,

    /// Attempts per chunk on transient read errors
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_cache_max_age")]
    pub cache_max_age_secs: u64,
}

fn default_inactivity_timeout() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_cache_max_age() -> u64 {
    31_536_000
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: default_inactivity_timeout(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
            cache_max_age_secs: default_cache_max_age(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

impl ToolsConfig {
    /// Configured ffprobe, or the one on `PATH`.
    pub fn ffprobe(&self) -> PathBuf {
        self.ffprobe_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("ffprobe"))
    }

    /// Configured ffmpeg, or the one on `PATH`.
    pub fn ffmpeg(&self) -> PathBuf {
        self.ffmpeg_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("ffmpeg"))
    }
}
