//! `Range` request header parsing.
//!
//! Only a single `bytes=` range is understood. Both bounds are optional and inclusive, an
//! absent start means the first byte and an absent end means the last byte.

use crate::protocol::RangeError;

const BYTES_PREFIX: &str = "bytes=";

/// A parsed byte range, both bounds inclusive when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Range {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl Range {
    /// The range covering `len` bytes from the first to the last one.
    pub fn full(len: u64) -> Self {
        Self { start: Some(0), end: Some(len.saturating_sub(1)) }
    }

    /// Resolves the inclusive `(start, end)` pair against content of `len` bytes.
    ///
    /// The end is clamped to the last byte. Returns `None` when the content is empty or the
    /// resolved start lies after the resolved end.
    pub fn resolve(&self, len: u64) -> Option<(u64, u64)> {
        let last = len.checked_sub(1)?;
        let start = self.start.unwrap_or(0);
        let end = self.end.map_or(last, |end| end.min(last));
        (start <= end).then_some((start, end))
    }
}

/// Parses the value of a `Range` header.
///
/// Returns `Ok(None)` when no range is requested: the header is missing or does not start with
/// `bytes=`. The remainder is split on the first `-`, every non-empty part must be a
/// non-negative integer.
pub fn parse_range(header: Option<&str>) -> Result<Option<Range>, RangeError> {
    let Some(spec) = header.and_then(|header| header.strip_prefix(BYTES_PREFIX)) else {
        return Ok(None);
    };

    if spec.contains(',') {
        return Err(RangeError::MultipleRanges);
    }

    let (start, end) = spec.split_once('-').unwrap_or((spec, ""));

    Ok(Some(Range { start: parse_bound(start)?, end: parse_bound(end)? }))
}

fn parse_bound(part: &str) -> Result<Option<u64>, RangeError> {
    if part.is_empty() {
        return Ok(None);
    }

    part.parse::<u64>().map(Some).map_err(|source| RangeError::InvalidBound { value: part.to_owned(), source })
}

#[cfg(test)]
mod tests {
    use super::{Range, parse_range};
    use crate::protocol::RangeError;

    #[test]
    fn missing_or_foreign_unit_is_no_range() {
        assert_eq!(parse_range(None).unwrap(), None);
        assert_eq!(parse_range(Some("")).unwrap(), None);
        assert_eq!(parse_range(Some("items=0-10")).unwrap(), None);
    }

    #[test]
    fn start_and_end() {
        let range = parse_range(Some("bytes=0-31")).unwrap().unwrap();
        assert_eq!(range, Range { start: Some(0), end: Some(31) });
    }

    #[test]
    fn open_end() {
        let range = parse_range(Some("bytes=96-")).unwrap().unwrap();
        assert_eq!(range, Range { start: Some(96), end: None });
        assert_eq!(range.resolve(185), Some((96, 184)));
    }

    #[test]
    fn both_bounds_absent() {
        let range = parse_range(Some("bytes=-")).unwrap().unwrap();
        assert_eq!(range, Range { start: None, end: None });
        assert_eq!(range.resolve(10), Some((0, 9)));
    }

    #[test]
    fn absent_start_counts_from_zero() {
        let range = parse_range(Some("bytes=-20")).unwrap().unwrap();
        assert_eq!(range.resolve(100), Some((0, 20)));
    }

    #[test]
    fn end_is_clamped() {
        let range = parse_range(Some("bytes=10-5000")).unwrap().unwrap();
        assert_eq!(range.resolve(185), Some((10, 184)));
    }

    #[test]
    fn inverted_range_does_not_resolve() {
        let range = parse_range(Some("bytes=50-10")).unwrap().unwrap();
        assert_eq!(range.resolve(100), None);
        assert_eq!(Range::full(0).resolve(0), None);
    }

    #[test]
    fn malformed_bounds_are_errors() {
        assert!(matches!(parse_range(Some("bytes=a-10")), Err(RangeError::InvalidBound { .. })));
        assert!(matches!(parse_range(Some("bytes=0-x")), Err(RangeError::InvalidBound { .. })));
        assert!(matches!(parse_range(Some("bytes=-1-2")), Err(RangeError::InvalidBound { .. })));
        assert!(matches!(parse_range(Some("bytes=1-2-3")), Err(RangeError::InvalidBound { .. })));
    }

    #[test]
    fn multiple_ranges_are_rejected() {
        assert!(matches!(parse_range(Some("bytes=0-10,20-30")), Err(RangeError::MultipleRanges)));
    }
}
