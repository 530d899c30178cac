//! Vidshelf-DB: Database schema, migrations, and query operations
//!
//! This crate provides the persisted video catalog for vidshelf using SQLite
//! with rusqlite and r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching database schema
//! - `queries` - Database query operations
//!
//! # Example
//!
//! ```no_run
//! use vidshelf_db::pool::{init_pool, get_conn};
//! use vidshelf_db::queries::videos;
//!
//! let pool = init_pool("/var/lib/vidshelf/vidshelf.db").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let video = videos::create_video(&conn, "clip.mp4", "shows/clip.mp4", 12.5, 93.0).unwrap();
//! println!("Cataloged video {}", video.id);
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
