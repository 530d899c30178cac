//! Vidshelf-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across vidshelf:
//!
//! - **Typed IDs**: A type-safe wrapper for catalog video identifiers
//! - **Core Types**: Enums for setting keys, list sorting, and duration buckets
//! - **Path Utilities**: Extension allow-list, content types, root-relative paths
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use vidshelf_common::{VideoId, Error, Result};
//! use vidshelf_common::paths::is_video_file;
//! use std::path::Path;
//!
//! let id = VideoId::from(42);
//! assert_eq!(id.as_i64(), 42);
//!
//! assert!(is_video_file(Path::new("movie.mkv")));
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("video"))
//! }
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
