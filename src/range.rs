//! Byte-range parsing (spec §4.6). Single-range `bytes=<start>-<end>` only;
//! multi-range requests and whitespace variants are not handled, preserving
//! the source's `range.slice(6, ..)` limitation deliberately rather than
//! silently broadening wire behavior (spec §9, Open Question).

const PREFIX: &str = "bytes=";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64, // inclusive
}

impl ByteRange {
    pub fn total(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Parses a `Range` header against a file of `size` bytes. Returns `None`
/// when the header is absent or malformed (the caller then serves the
/// whole file, per spec §4.6's "range-driven" gate). Returns
/// `Some(Err(size))` when `end >= size` (416, carrying `size` for the
/// `Content-Range: bytes */<size-1>` header).
///
/// Open question (spec §9): when `end` is the literal `0`, this parser
/// treats it as "absent" and defaults to `size - 1`, matching the source's
/// `parseInt(...) || size - 1` fallback exactly rather than silently fixing
/// what may be a bug — preserved as a documented wire-compatibility choice.
pub fn parse_range(header: &str, size: u64) -> Option<Result<ByteRange, u64>> {
    if !header.starts_with(PREFIX) {
        return None;
    }
    let spec = &header[PREFIX.len()..];
    let dash = spec.find('-')?;

    let start_str = &spec[..dash];
    let end_str = &spec[dash + 1..];

    let end: u64 = end_str.parse().ok().filter(|&e| e != 0).unwrap_or(size.saturating_sub(1));
    let start: u64 = start_str
        .parse()
        .ok()
        .unwrap_or_else(|| size.saturating_sub(end).saturating_sub(1));

    // `end >= size` is the literal check spec.md §4.6 names; `start > end`
    // is added for requests like `bytes=5000000-` where `start` alone
    // overruns the file but the defaulted `end` (`size - 1`) does not, so
    // the named check alone would let an out-of-range request through
    // (spec.md's own S4 scenario requires this request to be unsatisfiable).
    if end >= size || start > end {
        return Some(Err(size));
    }
    Some(Ok(ByteRange { start, end }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_range_header_is_none() {
        assert_eq!(parse_range("", 1000), None);
        assert_eq!(parse_range("garbage", 1000), None);
    }

    #[test]
    fn simple_range_s3_scenario() {
        let r = parse_range("bytes=100-199", 1_000_000).unwrap().unwrap();
        assert_eq!(r.start, 100);
        assert_eq!(r.end, 199);
        assert_eq!(r.total(), 100);
    }

    #[test]
    fn unsatisfiable_range_s4_scenario() {
        let err = parse_range("bytes=5000000-", 1_000_000).unwrap().unwrap_err();
        assert_eq!(err, 1_000_000);
    }

    #[test]
    fn missing_end_defaults_to_last_byte() {
        let r = parse_range("bytes=100-", 1000).unwrap().unwrap();
        assert_eq!(r.start, 100);
        assert_eq!(r.end, 999);
    }

    #[test]
    fn literal_zero_end_defaults_like_missing_end() {
        // Open question resolution: `end=0` is treated the same as absent.
        let r = parse_range("bytes=100-0", 1000).unwrap().unwrap();
        assert_eq!(r.end, 999);
    }

    #[test]
    fn zero_byte_file_with_range_does_not_underflow() {
        let err = parse_range("bytes=0-", 0).unwrap().unwrap_err();
        assert_eq!(err, 0);
    }

    #[test]
    fn suffix_style_range_is_not_rfc_suffix_semantics() {
        // `bytes=-500` is parsed by taking the text after the dash ("500")
        // as a literal `end`, not as a suffix length — a preserved quirk of
        // the literal port (spec §9, Open Question), not RFC 7233 behavior.
        let r = parse_range("bytes=-500", 1000).unwrap().unwrap();
        assert_eq!(r.start, 499);
        assert_eq!(r.end, 500);
    }
}
