//! HTTP `Range` header handling.
//!
//! Supports a single range per request:
//! - `bytes=0-499`
//! - `bytes=500-` (to end of file)
//! - `bytes=-500` (last 500 bytes)
//!
//! Anything else, or a range outside the file, is not satisfiable.

use vidshelf_common::{Error, Result};

/// An inclusive byte range within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// The whole file, or `None` for an empty one.
    pub fn full(size: u64) -> Option<Self> {
        (size > 0).then(|| Self {
            start: 0,
            end: size - 1,
        })
    }

    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// `Content-Range` header value.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

/// `Content-Range` value sent with a 416 response.
pub fn unsatisfiable_content_range(size: u64) -> String {
    format!("bytes */{}", size)
}

/// Parse a `Range` header against a file of `size` bytes.
///
/// Requires `0 <= start <= end < size`; an omitted end means the last byte.
pub fn parse_range(header: &str, size: u64) -> Result<ByteRange> {
    let unsatisfiable = || Error::range_not_satisfiable(header, size);

    let ranges = header.trim().strip_prefix("bytes=").ok_or_else(unsatisfiable)?;
    let (start, end) = ranges.split_once('-').ok_or_else(unsatisfiable)?;
    let (start, end) = (start.trim(), end.trim());

    let range = match (start.is_empty(), end.is_empty()) {
        (true, true) => return Err(unsatisfiable()),
        (true, false) => {
            let suffix: u64 = end.parse().map_err(|_| unsatisfiable())?;
            if suffix == 0 || size == 0 {
                return Err(unsatisfiable());
            }
            ByteRange {
                start: size.saturating_sub(suffix),
                end: size - 1,
            }
        }
        (false, true) => {
            let start: u64 = start.parse().map_err(|_| unsatisfiable())?;
            if size == 0 {
                return Err(unsatisfiable());
            }
            ByteRange {
                start,
                end: size - 1,
            }
        }
        (false, false) => ByteRange {
            start: start.parse().map_err(|_| unsatisfiable())?,
            end: end.parse().map_err(|_| unsatisfiable())?,
        },
    };

    if range.start > range.end || range.end >= size {
        return Err(unsatisfiable());
    }
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_explicit_range() {
        let r = parse_range("bytes=0-99", 1000).unwrap();
        assert_eq!(r, ByteRange { start: 0, end: 99 });
        assert_eq!(r.len(), 100);
        assert_eq!(r.content_range(1000), "bytes 0-99/1000");
    }

    #[test]
    fn test_parse_open_ended() {
        assert_eq!(
            parse_range("bytes=500-", 1000).unwrap(),
            ByteRange { start: 500, end: 999 }
        );
        assert_eq!(
            parse_range("bytes=999-", 1000).unwrap(),
            ByteRange { start: 999, end: 999 }
        );
    }

    #[test]
    fn test_parse_suffix() {
        assert_eq!(
            parse_range("bytes=-100", 1000).unwrap(),
            ByteRange { start: 900, end: 999 }
        );
        // Longer than the file means the whole file.
        assert_eq!(
            parse_range("bytes=-5000", 1000).unwrap(),
            ByteRange { start: 0, end: 999 }
        );
    }

    #[test]
    fn test_reject_out_of_bounds() {
        for header in ["bytes=2000-", "bytes=1000-", "bytes=0-1000", "bytes=50-10", "bytes=-0"] {
            let err = parse_range(header, 1000).unwrap_err();
            assert!(
                matches!(err, Error::RangeNotSatisfiable { size: 1000, .. }),
                "{header}"
            );
        }
    }

    #[test]
    fn test_reject_malformed() {
        for header in ["", "bytes=", "bytes=-", "items=0-9", "bytes=a-b", "bytes=0-1,5-6", "bytes 0-9"] {
            assert!(parse_range(header, 1000).is_err(), "{header:?}");
        }
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(ByteRange::full(0), None);
        assert!(parse_range("bytes=0-", 0).is_err());
        assert_eq!(unsatisfiable_content_range(0), "bytes */0");
    }
}
