// SPDX-License-Identifier: MIT OR Apache-2.0
//! Primitive-rule validation: byte-level shape, independent of any other
//! field's value. Grounded in the same two patterns the reference engine
//! checks at this layer — a semver string and a strict ISO-8601 UTC
//! timestamp — hand-rolled rather than pulled in via a regex dependency the
//! rest of this workspace has no other use for.

/// Parse `s` as `MAJOR.MINOR.PATCH` (each a decimal non-negative integer,
/// no leading `+`/whitespace). Returns `None` if `s` does not match.
#[must_use]
pub fn parse_semver(s: &str) -> Option<(u64, u64, u64)> {
    let mut parts = s.split('.');
    let major = parts.next()?;
    let minor = parts.next()?;
    let patch = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let major = parse_decimal(major)?;
    let minor = parse_decimal(minor)?;
    let patch = parse_decimal(patch)?;
    Some((major, minor, patch))
}

fn parse_decimal(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// `true` iff `s` matches `^\d+\.\d+\.\d+$` and its major component equals 1.
#[must_use]
pub fn is_semver_major_1(s: &str) -> bool {
    matches!(parse_semver(s), Some((1, _, _)))
}

/// `true` iff `s` matches the strict pattern
/// `^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z$`. This is a shape check only; it
/// does not reject e.g. month `13` or day `32`.
#[must_use]
pub fn is_iso8601_utc(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 20 {
        return false;
    }
    let digit = |i: usize| bytes[i].is_ascii_digit();
    (0..4).all(digit)
        && bytes[4] == b'-'
        && (5..7).all(digit)
        && bytes[7] == b'-'
        && (8..10).all(digit)
        && bytes[10] == b'T'
        && (11..13).all(digit)
        && bytes[13] == b':'
        && (14..16).all(digit)
        && bytes[16] == b':'
        && (17..19).all(digit)
        && bytes[19] == b'Z'
}

/// `true` iff `s` is non-empty after trimming ASCII/Unicode whitespace.
#[must_use]
pub fn is_non_blank(s: &str) -> bool {
    !s.trim().is_empty()
}

/// `true` iff every entry of `list` is non-blank.
#[must_use]
pub fn all_non_blank<'a>(list: impl IntoIterator<Item = &'a str>) -> bool {
    list.into_iter().all(is_non_blank)
}
