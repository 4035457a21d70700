//! Column letters and A1-style cell references
//!
//! The first 702 columns (`A`..`ZZ`) come from a cache built once on first
//! use; anything wider is computed with the general base-26 conversion.

use std::borrow::Cow;
use std::sync::OnceLock;

/// Number of cached column names: 26 single letters + 26 * 26 pairs
pub const CACHED_COLUMNS: u32 = 702;

fn cache() -> &'static [String] {
    static CACHE: OnceLock<Vec<String>> = OnceLock::new();
    CACHE.get_or_init(|| (0..CACHED_COLUMNS).map(compute_letters).collect())
}

/// Convert column index to Excel letters (0 -> A, 25 -> Z, 26 -> AA)
fn compute_letters(col: u32) -> String {
    let mut result = Vec::with_capacity(3);
    let mut n = col as u64 + 1;
    while n > 0 {
        n -= 1;
        result.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    result.reverse();
    // only ASCII letters were pushed
    String::from_utf8(result).unwrap_or_default()
}

/// Letters for zero-based column `col`.
pub fn column_letters(col: u32) -> Cow<'static, str> {
    match cache().get(col as usize) {
        Some(letters) => Cow::Borrowed(letters.as_str()),
        None => Cow::Owned(compute_letters(col)),
    }
}

/// Zero-based column index for `letters` (case-insensitive).
pub fn letters_to_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut index: u64 = 0;
    for ch in letters.bytes() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        index = index * 26 + (ch.to_ascii_uppercase() - b'A' + 1) as u64;
        if index > u32::MAX as u64 {
            return None;
        }
    }
    Some((index - 1) as u32)
}

/// A1-style reference for zero-based `(row, col)`.
pub fn cell_reference(row: u32, col: u32) -> String {
    let mut buf = Vec::with_capacity(8);
    push_cell_reference(&mut buf, row, col);
    String::from_utf8(buf).unwrap_or_default()
}

/// Append the A1-style reference for zero-based `(row, col)` to `buf`.
pub(crate) fn push_cell_reference(buf: &mut Vec<u8>, row: u32, col: u32) {
    buf.extend_from_slice(column_letters(col).as_bytes());
    let mut num = itoa::Buffer::new();
    buf.extend_from_slice(num.format(row as u64 + 1).as_bytes());
}

/// Zero-based `(row, col)` for an A1-style reference like `"AB12"`.
pub fn parse_cell_reference(reference: &str) -> Option<(u32, u32)> {
    let split = reference
        .find(|c: char| c.is_ascii_digit())
        .filter(|&i| i > 0)?;
    let col = letters_to_index(&reference[..split])?;
    let row: u32 = reference[split..].parse().ok()?;
    Some((row.checked_sub(1)?, col))
}
