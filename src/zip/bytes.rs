//! Little-endian field access, DOS timestamps and text decoding

use crate::error::{Result, XlsxError};
use chrono::{Datelike, NaiveDateTime, Timelike};

#[inline]
pub fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Read a little-endian `u16` at `offset`.
pub fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    offset
        .checked_add(2)
        .and_then(|end| data.get(offset..end))
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| truncated(offset, 2, data.len()))
}

/// Read a little-endian `u32` at `offset`.
pub fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    offset
        .checked_add(4)
        .and_then(|end| data.get(offset..end))
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| truncated(offset, 4, data.len()))
}

fn truncated(offset: usize, width: usize, len: usize) -> XlsxError {
    XlsxError::InvalidArchive(format!(
        "read of {} bytes at offset {} past end of {}-byte buffer",
        width, offset, len
    ))
}

/// Encode a timestamp as DOS `(time, date)` fields.
///
/// Seconds are stored at 2-second resolution and years as an offset from
/// 1980; timestamps outside 1980..=2107 are clamped to the nearest bound.
pub fn dos_date_time(ts: &NaiveDateTime) -> (u16, u16) {
    let year = ts.year().clamp(1980, 2107);
    if year != ts.year() {
        return if ts.year() < 1980 {
            (0, (1 << 5) | 1)
        } else {
            (
                (23 << 11) | (59 << 5) | 29,
                ((2107 - 1980) << 9) | (12 << 5) | 31,
            )
        };
    }

    let time = ((ts.hour() as u16) << 11) | ((ts.minute() as u16) << 5) | (ts.second() as u16 / 2);
    let date = (((year - 1980) as u16) << 9) | ((ts.month() as u16) << 5) | ts.day() as u16;
    (time, date)
}

/// DOS `(time, date)` for the current local wall-clock time.
pub fn dos_now() -> (u16, u16) {
    dos_date_time(&chrono::Local::now().naive_local())
}

/// Decode entry bytes as UTF-8 text.
pub fn decode_text(data: Vec<u8>) -> Result<String> {
    Ok(String::from_utf8(data)?)
}
