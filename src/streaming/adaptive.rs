//! Throughput-adaptive chunk sizing.
//!
//! The base chunk size is tiered by file size. A [`CongestionWindow`] starts
//! at that base and moves within `[base, 2 * base]` as measured throughput
//! drops or rises between chunks.

use std::time::Duration;

const KB: usize = 1024;
const MB: u64 = 1024 * 1024;

/// Relative throughput change that counts as a drop or a rise.
const DROP_RATIO: f64 = 0.8;
const RISE_RATIO: f64 = 1.2;

const SHRINK_FACTOR: f64 = 0.7;
const GROW_FACTOR: f64 = 1.2;

/// Pause after a chunk when throughput held or rose.
pub const MIN_PAUSE: Duration = Duration::from_millis(1);

/// Longest pause after a throughput drop.
pub const MAX_BACKOFF: Duration = Duration::from_millis(50);

/// Base chunk size for a file of `file_size` bytes.
pub fn chunk_size_for(file_size: u64) -> usize {
    if file_size <= 100 * MB {
        512 * KB
    } else if file_size <= 1024 * MB {
        1024 * KB
    } else if file_size <= 2048 * MB {
        2048 * KB
    } else {
        4096 * KB
    }
}

/// What the window did in response to a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Shrunk,
    Grown,
    Held,
}

/// Self-tuning read size, clamped to `[base, 2 * base]`.
#[derive(Debug, Clone)]
pub struct CongestionWindow {
    base: usize,
    window: usize,
    last_throughput: Option<f64>,
}

impl CongestionWindow {
    pub fn new(base: usize) -> Self {
        let base = base.max(1);
        Self {
            base,
            window: base,
            last_throughput: None,
        }
    }

    /// Window for a file of `file_size` bytes.
    pub fn for_file(file_size: u64) -> Self {
        Self::new(chunk_size_for(file_size))
    }

    /// Current read size.
    pub fn size(&self) -> usize {
        self.window
    }

    pub fn base(&self) -> usize {
        self.base
    }

    /// Largest size the window may reach.
    pub fn cap(&self) -> usize {
        self.base * 2
    }

    /// Feed one transfer measurement. Returns how the window changed and how
    /// long to pause before the next chunk.
    pub fn record(&mut self, bytes: usize, elapsed: Duration) -> (Adjustment, Duration) {
        let secs = elapsed.as_secs_f64().max(1e-6);
        let throughput = bytes as f64 / secs;
        let ratio = match self.last_throughput {
            Some(prev) if prev > 0.0 => throughput / prev,
            _ => 1.0,
        };
        self.last_throughput = Some(throughput);

        if ratio < DROP_RATIO {
            self.window = self.clamp(self.window as f64 * SHRINK_FACTOR);
            let pause = elapsed.mul_f64(0.1).min(MAX_BACKOFF);
            (Adjustment::Shrunk, pause)
        } else if ratio > RISE_RATIO {
            self.window = self.clamp(self.window as f64 * GROW_FACTOR);
            (Adjustment::Grown, MIN_PAUSE)
        } else {
            (Adjustment::Held, MIN_PAUSE)
        }
    }

    fn clamp(&self, size: f64) -> usize {
        (size as usize).clamp(self.base, self.cap())
    }
}
