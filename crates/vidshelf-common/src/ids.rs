//! Typed ID wrappers for type safety across vidshelf.
//!
//! Catalog rows use SQLite integer primary keys. The newtype keeps a video id
//! from being confused with other integers (positions, sizes, seeds).

use serde::{Deserialize, Serialize};

/// Unique identifier for a cataloged video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(i64);

impl VideoId {
    /// Raw integer value as stored in the database.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for VideoId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<VideoId> for i64 {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for VideoId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(Self)
    }
}
