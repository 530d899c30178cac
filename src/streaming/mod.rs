//! Adaptive byte-range streaming.
//!
//! One request streams one video's bytes under HTTP range semantics. Reads
//! are sized by a congestion window that follows measured throughput, an
//! inactive stream is aborted, and transient read errors are retried.
//!
//! # Routes
//!
//! - `GET /api/videos/{id}/stream` - video bytes with `Range` support

pub mod adaptive;
mod direct;
pub mod engine;
pub mod range;

use std::time::Duration;

pub use adaptive::{chunk_size_for, CongestionWindow};
pub use direct::stream_video;
pub use engine::{RangeStream, StreamPhase};
pub use range::{parse_range, ByteRange};

use crate::config::StreamingConfig;

/// Timeouts, retry policy and caching of streamed responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    pub inactivity_timeout: Duration,
    /// Retries of one chunk after a transient read error.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub cache_max_age_secs: u64,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self::from(&StreamingConfig::default())
    }
}

impl From<&StreamingConfig> for StreamOptions {
    fn from(config: &StreamingConfig) -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(config.inactivity_timeout_secs),
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            cache_max_age_secs: config.cache_max_age_secs,
        }
    }
}
