//! Database query modules.
//!
//! - videos: catalog CRUD, scan upserts, listings, flags and watch progress
//! - settings: key-value settings and the typed library view

pub mod settings;
pub mod videos;
