//! Vidshelf - personal video library with range streaming
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod files;
pub mod scanner;
pub mod server;
pub mod state;
pub mod streaming;
