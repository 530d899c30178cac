//! Media file probing module.
//!
//! Probing shells out to the ffprobe CLI and parses its JSON output.

mod ffprobe;
mod types;

pub use ffprobe::{probe_with_ffprobe, Ffprobe};
pub use types::*;
