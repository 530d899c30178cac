//! Common error types used throughout vidshelf.
//!
//! This module provides a unified error type covering the failure cases of
//! the catalog, the reconciler and the streaming engine.

/// Common error type for vidshelf.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested record or file was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A byte range could not be satisfied for a file of the given size.
    #[error("Range not satisfiable: {range} (file size {size})")]
    RangeNotSatisfiable { range: String, size: u64 },

    /// Metadata probing failed. Never fatal for a scan.
    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    /// A database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// A unique-constraint race on insert.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No progress was made within the allowed window.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new RangeNotSatisfiable error.
    pub fn range_not_satisfiable<S: Into<String>>(range: S, size: u64) -> Self {
        Self::RangeNotSatisfiable {
            range: range.into(),
            size,
        }
    }

    /// Create a new ProbeFailed error.
    pub fn probe_failed<S: Into<String>>(msg: S) -> Self {
        Self::ProbeFailed(msg.into())
    }

    /// Create a new Database error.
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }

    /// Create a new Conflict error.
    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a new Timeout error.
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a new Io error from a message.
    pub fn io<S: Into<String>>(msg: S) -> Self {
        Self::Io(std::io::Error::other(msg.into()))
    }

    /// Whether this error is a "not found" of any origin, including a
    /// missing file surfaced as an I/O error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// HTTP status code this error maps to at the API boundary.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::RangeNotSatisfiable { .. } => 416,
            Self::Conflict(_) => 409,
            Self::InvalidInput(_) => 400,
            Self::Timeout(_) => 504,
            Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound => 404,
            Self::ProbeFailed(_) | Self::Database(_) | Self::Io(_) | Self::Internal(_) => 500,
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
